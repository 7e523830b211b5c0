//! Routes inbound server messages to the directory, fan-out, or status line.

use std::sync::Arc;

use voice_relay_domain::{Notification, RelayError, ServerMessage};

use crate::fan_out::ResultFanOut;
use crate::session::Session;

#[derive(Clone)]
pub struct InboundDispatcher {
    session: Arc<Session>,
    fan_out: Arc<ResultFanOut>,
}

impl InboundDispatcher {
    pub fn new(session: Arc<Session>, fan_out: Arc<ResultFanOut>) -> Self {
        Self { session, fan_out }
    }

    /// Handle one text message. Errors are reported, never propagated.
    pub fn dispatch_text(&self, payload: &str) {
        match ServerMessage::parse(payload) {
            Ok(Some(message)) => self.route(message),
            Ok(None) => tracing::debug!("ignoring untyped server message"),
            Err(err) => self.malformed(&err),
        }
    }

    /// Binary messages are accepted when they hold UTF-8 JSON.
    pub fn dispatch_binary(&self, payload: &[u8]) {
        match std::str::from_utf8(payload) {
            Ok(text) => self.dispatch_text(text),
            Err(e) => self.malformed(&RelayError::MalformedServerMessage(e.to_string())),
        }
    }

    fn route(&self, message: ServerMessage) {
        match message {
            ServerMessage::LanguagePairs { data } => {
                tracing::info!(sources = data.len(), "received language pairs");
                self.session.update_directory(&data);
            }
            ServerMessage::Result(record) => {
                tracing::debug!(?record, "received result");
                self.fan_out.handle(&record);
            }
            ServerMessage::Error { message } => {
                let err = RelayError::ServerReportedError(message);
                tracing::warn!(error = %err, "server reported an error");
                self.session.notify(Notification::error(err.to_string()));
            }
            ServerMessage::Unknown => tracing::debug!("ignoring unknown server message type"),
        }
    }

    fn malformed(&self, err: &RelayError) {
        tracing::warn!(error = %err, "failed to process server message");
        self.session
            .notify(Notification::error("Error processing server response"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionEvent;
    use voice_relay_domain::{Language, StatusLevel};

    fn dispatcher() -> (Arc<Session>, Arc<ResultFanOut>, InboundDispatcher) {
        let session = Arc::new(Session::new());
        let fan_out = Arc::new(ResultFanOut::new(session.clone()));
        let dispatcher = InboundDispatcher::new(session.clone(), fan_out.clone());
        (session, fan_out, dispatcher)
    }

    fn statuses(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SessionEvent::Status(notification) = event {
                out.push(notification);
            }
        }
        out
    }

    #[test]
    fn language_pairs_replace_directory() {
        let (session, _, dispatcher) = dispatcher();
        dispatcher.dispatch_text(r#"{"type":"language_pairs","data":{"de":["en"],"xx":["en"]}}"#);
        let directory = session.directory();
        assert_eq!(directory.sources().collect::<Vec<_>>(), vec![Language::GERMAN]);
        assert_eq!(directory.target(), Some(Language::ENGLISH));
    }

    #[test]
    fn misshapen_language_entries_are_skipped_not_fatal() {
        let (session, _, dispatcher) = dispatcher();
        let mut events = session.subscribe();
        dispatcher.dispatch_text(
            r#"{"type":"language_pairs","data":{"xx":{"beta":true},"en":["es",null]}}"#,
        );
        assert!(statuses(&mut events).is_empty());
        let directory = session.directory();
        assert_eq!(directory.source(), Some(Language::ENGLISH));
        assert_eq!(directory.targets(), &[Language::SPANISH]);
    }

    #[test]
    fn result_reaches_fan_out() {
        let (_, fan_out, dispatcher) = dispatcher();
        dispatcher.dispatch_text(r#"{"type":"result","transcription":"hola"}"#);
        assert_eq!(fan_out.transcripts().transcription, "hola\n\n");
    }

    #[test]
    fn server_error_becomes_status() {
        let (session, _, dispatcher) = dispatcher();
        let mut events = session.subscribe();
        dispatcher.dispatch_text(r#"{"type":"error","message":"model busy"}"#);
        assert_eq!(
            statuses(&mut events),
            vec![Notification::error("Server error: model busy")]
        );
    }

    #[test]
    fn unknown_type_changes_nothing() {
        let (session, fan_out, dispatcher) = dispatcher();
        let mut events = session.subscribe();
        let mut broadcasts = fan_out.subscribe();
        dispatcher.dispatch_text(r#"{"type":"ping"}"#);
        assert!(events.try_recv().is_err());
        assert!(broadcasts.try_recv().is_err());
        assert_eq!(fan_out.transcripts().transcription, "");
    }

    #[test]
    fn garbage_is_reported_and_survivable() {
        let (session, fan_out, dispatcher) = dispatcher();
        let mut events = session.subscribe();
        dispatcher.dispatch_text("{not json");
        dispatcher.dispatch_binary(&[0xFF, 0xFE]);
        let reported = statuses(&mut events);
        assert_eq!(reported.len(), 2);
        assert!(reported.iter().all(|n| n.level == StatusLevel::Error));

        // Later messages are still processed.
        dispatcher.dispatch_binary(br#"{"type":"result","translation":"salut"}"#);
        assert_eq!(fan_out.transcripts().translation, "salut\n\n");
    }
}
