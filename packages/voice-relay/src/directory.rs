//! Source to target language graph advertised by the server.

use indexmap::IndexMap;
use serde_json::Value;
use voice_relay_domain::{Language, LanguagePair, RawLanguagePairs, RelayError};

/// Keep only known sources, each with its known targets, in server order.
///
/// A source whose value is not a list is dropped, as is any target that is
/// not a known code. Applying this twice gives the same result as applying it
/// once.
pub fn filter(raw: &RawLanguagePairs) -> RawLanguagePairs {
    raw.iter()
        .filter(|(source, _)| Language::is_known(source))
        .filter_map(|(source, targets)| {
            let known: Vec<Value> = targets
                .as_array()?
                .iter()
                .filter(|target| target.as_str().is_some_and(Language::is_known))
                .cloned()
                .collect();
            Some((source.clone(), Value::Array(known)))
        })
        .collect()
}

/// The filtered language graph plus the active selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageDirectory {
    pairs: IndexMap<Language, Vec<Language>>,
    source: Option<Language>,
    target: Option<Language>,
}

impl LanguageDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a server advertisement.
    pub fn from_raw(raw: &RawLanguagePairs) -> Self {
        let mut directory = Self::new();
        directory.update(raw);
        directory
    }

    /// Replace the whole graph and re-derive the default selection.
    pub fn update(&mut self, raw: &RawLanguagePairs) {
        self.pairs = filter(raw)
            .iter()
            .filter_map(|(source, targets)| {
                let source = Language::from_code(source)?;
                let targets = targets
                    .as_array()?
                    .iter()
                    .filter_map(|code| code.as_str().and_then(Language::from_code))
                    .collect();
                Some((source, targets))
            })
            .collect();
        self.source = self.default_source();
        self.target = self.source.and_then(|source| self.default_target(source));
        tracing::debug!(
            sources = self.pairs.len(),
            source = ?self.source.map(|l| l.code()),
            target = ?self.target.map(|l| l.code()),
            "language directory updated"
        );
    }

    fn default_source(&self) -> Option<Language> {
        if self.pairs.contains_key(&Language::ENGLISH) {
            return Some(Language::ENGLISH);
        }
        self.pairs
            .iter()
            .find(|(_, targets)| !targets.is_empty())
            .or_else(|| self.pairs.first())
            .map(|(source, _)| *source)
    }

    fn default_target(&self, source: Language) -> Option<Language> {
        let targets = self.pairs.get(&source)?;
        if targets.contains(&Language::SPANISH) {
            Some(Language::SPANISH)
        } else {
            targets.first().copied()
        }
    }

    /// Select a source by code; the target falls back to that source's default.
    pub fn select_source(&mut self, code: &str) -> Result<Language, RelayError> {
        let source = Language::from_code(code)
            .filter(|lang| self.pairs.contains_key(lang))
            .ok_or_else(|| RelayError::UnknownLanguage(code.to_string()))?;
        self.source = Some(source);
        self.target = self.default_target(source);
        Ok(source)
    }

    /// Select a target among the current source's targets.
    pub fn select_target(&mut self, code: &str) -> Result<Language, RelayError> {
        let target = Language::from_code(code)
            .filter(|lang| self.targets().contains(lang))
            .ok_or_else(|| RelayError::UnknownLanguage(code.to_string()))?;
        self.target = Some(target);
        Ok(target)
    }

    pub fn source(&self) -> Option<Language> {
        self.source
    }

    pub fn target(&self) -> Option<Language> {
        self.target
    }

    /// Both halves of the selection, if both are set.
    pub fn active_pair(&self) -> Option<LanguagePair> {
        Some(LanguagePair::new(self.source?, self.target?))
    }

    /// Targets offered for the current source.
    pub fn targets(&self) -> &[Language] {
        self.source
            .and_then(|source| self.pairs.get(&source))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn targets_for(&self, source: Language) -> &[Language] {
        self.pairs
            .get(&source)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every source key, in server order.
    pub fn sources(&self) -> impl Iterator<Item = Language> + '_ {
        self.pairs.keys().copied()
    }

    /// Sources that have at least one target.
    pub fn selectable_sources(&self) -> Vec<Language> {
        self.pairs
            .iter()
            .filter(|(_, targets)| !targets.is_empty())
            .map(|(source, _)| *source)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
