//! Result display and republishing to local listeners.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use voice_relay_domain::{
    BROADCAST_CHANNEL, Language, Notification, ResultRecord, TranslationBroadcast,
};

use crate::session::{Session, SessionEvent, TranscriptKind};

const BROADCAST_CAPACITY: usize = 64;

/// The two running transcripts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcripts {
    pub transcription: String,
    pub translation: String,
}

impl Transcripts {
    fn buffer(&mut self, kind: TranscriptKind) -> &mut String {
        match kind {
            TranscriptKind::Transcription => &mut self.transcription,
            TranscriptKind::Translation => &mut self.translation,
        }
    }
}

pub struct ResultFanOut {
    session: Arc<Session>,
    transcripts: Mutex<Transcripts>,
    channel: broadcast::Sender<TranslationBroadcast>,
}

impl ResultFanOut {
    pub fn new(session: Arc<Session>) -> Self {
        let (channel, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            session,
            transcripts: Mutex::new(Transcripts::default()),
            channel,
        }
    }

    /// Listen on the local broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TranslationBroadcast> {
        self.channel.subscribe()
    }

    pub fn transcripts(&self) -> Transcripts {
        self.transcripts.lock().clone()
    }

    pub fn clear(&self) {
        *self.transcripts.lock() = Transcripts::default();
    }

    /// Append a result to the transcripts and republish it.
    ///
    /// Returns the broadcast that was published, if the record had any text.
    pub fn handle(&self, record: &ResultRecord) -> Option<TranslationBroadcast> {
        let appended = [
            (TranscriptKind::Transcription, record.transcription_text()),
            (TranscriptKind::Translation, record.translation_text()),
        ];
        for (kind, text) in appended {
            let Some(text) = text else { continue };
            let line = format!("{text}\n\n");
            self.transcripts.lock().buffer(kind).push_str(&line);
            self.session.emit(SessionEvent::Transcript { kind, text: line });
        }

        let published = record.best_text().map(|text| {
            // Labeled with the selection at broadcast time, not at send time.
            let directory = self.session.directory();
            let code = |lang: Option<Language>| {
                lang.map(|l| l.code()).unwrap_or_default()
            };
            let message =
                TranslationBroadcast::new(text, code(directory.source()), code(directory.target()));
            if self.channel.send(message.clone()).is_err() {
                tracing::trace!(channel = BROADCAST_CHANNEL, "no local listeners");
            }
            message
        });

        self.session.notify(Notification::success("Ready"));
        published
    }
}

/// Forward every broadcast to `target` as one JSON datagram.
///
/// Runs until the broadcast channel closes. Send failures are logged and
/// skipped.
pub fn spawn_udp_forwarder(
    mut messages: broadcast::Receiver<TranslationBroadcast>,
    target: SocketAddr,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = match UdpSocket::bind(bind).await {
            Ok(socket) => socket,
            Err(e) => {
                tracing::error!(error = %e, "failed to bind broadcast socket");
                return;
            }
        };
        tracing::info!(%target, channel = BROADCAST_CHANNEL, "forwarding broadcasts over UDP");
        loop {
            let message = match messages.recv().await {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "broadcast forwarder lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let payload = match serde_json::to_vec(&message) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode broadcast");
                    continue;
                }
            };
            if let Err(e) = socket.send_to(&payload, target).await {
                tracing::warn!(error = %e, %target, "failed to forward broadcast");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_relay_domain::{RawLanguagePairs, StatusLevel};

    fn fan_out() -> (Arc<Session>, ResultFanOut) {
        let session = Arc::new(Session::new());
        let raw: RawLanguagePairs = [("en".to_string(), serde_json::json!(["es"]))]
            .into_iter()
            .collect();
        session.update_directory(&raw);
        let fan_out = ResultFanOut::new(session.clone());
        (session, fan_out)
    }

    fn record(transcription: Option<&str>, translation: Option<&str>) -> ResultRecord {
        ResultRecord {
            transcription: transcription.map(str::to_string),
            translation: translation.map(str::to_string),
        }
    }

    #[test]
    fn transcription_only_result_is_appended_and_broadcast_once() {
        let (_session, fan_out) = fan_out();
        let mut listener = fan_out.subscribe();

        fan_out.handle(&record(Some("hola"), None));

        assert_eq!(fan_out.transcripts().transcription, "hola\n\n");
        assert_eq!(fan_out.transcripts().translation, "");
        let message = listener.try_recv().expect("one broadcast");
        assert_eq!(message, TranslationBroadcast::new("hola", "en", "es"));
        assert!(listener.try_recv().is_err());
    }

    #[test]
    fn translation_wins_in_broadcast() {
        let (_session, fan_out) = fan_out();
        let message = fan_out
            .handle(&record(Some("hello"), Some("hola")))
            .expect("broadcast");
        assert_eq!(message.text, "hola");
        assert_eq!(fan_out.transcripts().translation, "hola\n\n");
    }

    #[test]
    fn empty_result_publishes_nothing() {
        let (session, fan_out) = fan_out();
        let mut events = session.subscribe();
        assert_eq!(fan_out.handle(&record(Some(""), None)), None);
        assert_eq!(fan_out.transcripts(), Transcripts::default());
        // Only the status line is emitted.
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::Status(Notification {
                level: StatusLevel::Success,
                ..
            }))
        ));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn transcripts_accumulate_in_order_and_clear() {
        let (_session, fan_out) = fan_out();
        fan_out.handle(&record(Some("one"), None));
        fan_out.handle(&record(Some("two"), Some("dos")));
        assert_eq!(fan_out.transcripts().transcription, "one\n\ntwo\n\n");
        fan_out.clear();
        assert_eq!(fan_out.transcripts(), Transcripts::default());
    }

    #[tokio::test]
    async fn udp_forwarder_sends_json_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let target = receiver.local_addr().expect("addr");
        let (_session, fan_out) = fan_out();
        let forwarder = spawn_udp_forwarder(fan_out.subscribe(), target);

        fan_out.handle(&record(None, Some("bonjour")));

        let mut buf = [0u8; 512];
        let (len, _) = receiver.recv_from(&mut buf).await.expect("datagram");
        let message: TranslationBroadcast =
            serde_json::from_slice(&buf[..len]).expect("json datagram");
        assert_eq!(message.text, "bonjour");

        drop(fan_out);
        forwarder.await.expect("forwarder exits when channel closes");
    }
}
