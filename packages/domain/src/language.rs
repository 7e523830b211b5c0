//! ISO 639-1 language codes the relay knows how to present.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A member of the known-language allow-list.
///
/// Values can only be obtained from the associated constants or
/// [`Language::from_code`], so every `Language` is a known language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
    name: &'static str,
}

impl Language {
    const fn new(code: &'static str, name: &'static str) -> Self {
        Self { code, name }
    }

    /// Get the underlying two-letter code.
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a code in the allow-list.
    pub fn from_code(code: &str) -> Option<Self> {
        KNOWN_LANGUAGES.iter().copied().find(|lang| lang.code == code)
    }

    /// Whether `code` belongs to the allow-list.
    pub fn is_known(code: &str) -> bool {
        Self::from_code(code).is_some()
    }

    pub const ENGLISH: Self = Self::new("en", "English");
    pub const SPANISH: Self = Self::new("es", "Spanish");
    pub const FRENCH: Self = Self::new("fr", "French");
    pub const GERMAN: Self = Self::new("de", "German");
    pub const ITALIAN: Self = Self::new("it", "Italian");
    pub const PORTUGUESE: Self = Self::new("pt", "Portuguese");
    pub const RUSSIAN: Self = Self::new("ru", "Russian");
    pub const CHINESE: Self = Self::new("zh", "Chinese (Mandarin)");
    pub const JAPANESE: Self = Self::new("ja", "Japanese");
    pub const ARABIC: Self = Self::new("ar", "Arabic");
    pub const HINDI: Self = Self::new("hi", "Hindi");
    pub const DUTCH: Self = Self::new("nl", "Dutch");
    pub const POLISH: Self = Self::new("pl", "Polish");
    pub const TURKISH: Self = Self::new("tr", "Turkish");
}

/// The fixed allow-list, in presentation order.
pub const KNOWN_LANGUAGES: [Language; 14] = [
    Language::ENGLISH,
    Language::SPANISH,
    Language::FRENCH,
    Language::GERMAN,
    Language::ITALIAN,
    Language::PORTUGUESE,
    Language::RUSSIAN,
    Language::CHINESE,
    Language::JAPANESE,
    Language::ARABIC,
    Language::HINDI,
    Language::DUTCH,
    Language::POLISH,
    Language::TURKISH,
];

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Language::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown language code `{code}`")))
    }
}

/// A source → target pair, copied by value wherever it is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguagePair {
    pub from: Language,
    pub to: Language,
}

impl LanguagePair {
    pub const fn new(from: Language, to: Language) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.from.code, self.to.code)
    }
}
