//! Shared session state and the event channel front ends listen on.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::broadcast;
use voice_relay_domain::{
    ConnectionState, Language, LanguagePair, Notification, RawLanguagePairs, RelayError,
    StatusLevel,
};

use crate::directory::LanguageDirectory;

const EVENT_CAPACITY: usize = 256;

/// Which running transcript a line was appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptKind {
    Transcription,
    Translation,
}

/// Whether the start and stop controls are currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub can_start: bool,
    pub can_stop: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(Notification),
    Connection(ConnectionState),
    Controls(Controls),
    /// `text` already carries its trailing blank line.
    Transcript { kind: TranscriptKind, text: String },
    /// The language directory was replaced.
    Directory,
}

/// State owned by one relay session.
///
/// Locks here are short-lived and never held across an `.await`.
pub struct Session {
    connection: RwLock<ConnectionState>,
    listening: AtomicBool,
    directory: RwLock<LanguageDirectory>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connection: RwLock::new(ConnectionState::Disconnected),
            listening: AtomicBool::new(false),
            directory: RwLock::new(LanguageDirectory::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Log a status line and publish it to front ends.
    pub fn notify(&self, notification: Notification) {
        match notification.level {
            StatusLevel::Error => tracing::error!(status = %notification.message),
            StatusLevel::Warning => tracing::warn!(status = %notification.message),
            StatusLevel::Info | StatusLevel::Success => {
                tracing::info!(status = %notification.message)
            }
        }
        self.emit(SessionEvent::Status(notification));
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.read()
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.connection.write(), state);
        if previous == state {
            return;
        }
        tracing::debug!(from = %previous, to = %state, "connection state changed");
        self.emit(SessionEvent::Connection(state));
        self.emit(SessionEvent::Controls(self.controls()));
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub(crate) fn set_listening(&self, listening: bool) {
        if self.listening.swap(listening, Ordering::SeqCst) != listening {
            self.emit(SessionEvent::Controls(self.controls()));
        }
    }

    pub fn controls(&self) -> Controls {
        let connected = self.connection_state().is_connected();
        let listening = self.is_listening();
        Controls {
            can_start: connected && !listening,
            can_stop: connected && listening,
        }
    }

    /// Snapshot of the directory for display.
    pub fn directory(&self) -> LanguageDirectory {
        self.directory.read().clone()
    }

    pub fn update_directory(&self, raw: &RawLanguagePairs) {
        self.directory.write().update(raw);
        self.emit(SessionEvent::Directory);
    }

    pub fn select_source(&self, code: &str) -> Result<Language, RelayError> {
        let source = self.directory.write().select_source(code)?;
        self.emit(SessionEvent::Directory);
        Ok(source)
    }

    pub fn select_target(&self, code: &str) -> Result<Language, RelayError> {
        let target = self.directory.write().select_target(code)?;
        self.emit(SessionEvent::Directory);
        Ok(target)
    }

    /// The selected pair, read as one snapshot.
    pub fn active_pair(&self) -> Option<LanguagePair> {
        self.directory.read().active_pair()
    }
}
