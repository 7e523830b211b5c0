mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ScriptedConnector, StalledConnector, drain, settle, states, statuses};
use tokio::time::Instant;
use voice_relay::domain::{
    AudioMetadata, ConnectionState, Language, LanguagePair, Notification, PcmBuffer, StatusLevel,
};
use voice_relay::{
    ConnectionHandle, Connector, FixedDelay, FrameSink, InboundDispatcher, ResultFanOut,
    SendOutcome, Session, build_frame,
};

const DELAY: Duration = Duration::from_secs(5);

struct Harness {
    session: Arc<Session>,
    fan_out: Arc<ResultFanOut>,
    handle: ConnectionHandle,
}

fn harness(connector: Arc<dyn Connector>, delay: Duration) -> Harness {
    let session = Arc::new(Session::new());
    let fan_out = Arc::new(ResultFanOut::new(session.clone()));
    let dispatcher = InboundDispatcher::new(session.clone(), fan_out.clone());
    let handle = ConnectionHandle::spawn(
        session.clone(),
        connector,
        Arc::new(FixedDelay::new(delay)),
        dispatcher,
    );
    Harness {
        session,
        fan_out,
        handle,
    }
}

fn frame() -> voice_relay::WireFrame {
    build_frame(
        &AudioMetadata::new(LanguagePair::new(Language::ENGLISH, Language::SPANISH)),
        &PcmBuffer::new(vec![1, 2, 3]),
    )
}

#[tokio::test(start_paused = true)]
async fn reconnects_exactly_once_after_close() {
    let (connector, mut servers) = ScriptedConnector::new([]);
    let h = harness(connector.clone(), DELAY);
    let mut events = h.session.subscribe();

    let first = servers.recv().await.expect("first connection");
    settle().await;
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);

    let closed_at = Instant::now();
    first.close();
    let _second = servers.recv().await.expect("reconnected");
    let waited = closed_at.elapsed();
    assert!(waited >= DELAY, "reconnected too early: {waited:?}");
    assert!(waited < DELAY + Duration::from_millis(100), "reconnected late: {waited:?}");

    settle().await;
    // An open link schedules nothing further.
    tokio::time::sleep(DELAY * 3).await;
    assert_eq!(connector.attempts(), 2);

    let seen = drain(&mut events);
    assert_eq!(
        states(&seen),
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );
    assert!(statuses(&seen).contains(&Notification::error(
        "Disconnected from server. Reconnecting..."
    )));
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failed_connect_is_reported_and_retried_after_delay() {
    let (connector, mut servers) = ScriptedConnector::new([false]);
    let h = harness(connector.clone(), DELAY);
    let mut events = h.session.subscribe();

    let started = Instant::now();
    let _server = servers.recv().await.expect("second attempt connects");
    assert!(started.elapsed() >= DELAY);
    assert_eq!(connector.attempts(), 2);

    settle().await;
    let seen = drain(&mut events);
    let reported = statuses(&seen);
    assert!(reported.contains(&Notification::success("Connected to server")));
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn send_while_disconnected_is_dropped_without_state_change() {
    let (connector, _servers) = ScriptedConnector::new([false]);
    let h = harness(connector, Duration::from_secs(60));
    settle().await;
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);

    let mut events = h.session.subscribe();
    assert_eq!(h.handle.send(frame()), SendOutcome::Dropped);
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);

    let seen = drain(&mut events);
    assert!(states(&seen).is_empty());
    let reported = statuses(&seen);
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].level, StatusLevel::Warning);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn send_while_connecting_is_dropped() {
    let h = harness(Arc::new(StalledConnector), DELAY);
    settle().await;
    assert_eq!(h.session.connection_state(), ConnectionState::Connecting);
    assert_eq!(h.handle.send(frame()), SendOutcome::Dropped);
    assert_eq!(h.session.connection_state(), ConnectionState::Connecting);
    h.handle.shutdown().await;
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn frames_are_not_replayed_after_reconnect() {
    let (connector, mut servers) = ScriptedConnector::new([]);
    let h = harness(connector, DELAY);
    let mut first = servers.recv().await.expect("connected");
    settle().await;

    assert_eq!(h.handle.send(frame()), SendOutcome::Sent);
    assert_eq!(first.next_frame().await, frame().into_bytes());

    first.close();
    settle().await;
    assert_eq!(h.handle.send(frame()), SendOutcome::Dropped);

    let mut second = servers.recv().await.expect("reconnected");
    settle().await;
    assert!(second.frames.try_next().is_err(), "nothing queued while disconnected");
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn inbound_messages_are_processed_in_order() {
    let (connector, mut servers) = ScriptedConnector::new([]);
    let h = harness(connector, DELAY);
    let mut broadcasts = h.fan_out.subscribe();
    let server = servers.recv().await.expect("connected");

    server.send_text(r#"{"type":"language_pairs","data":{"en":["fr"],"xx":["en"]}}"#);
    server.send_text("definitely not json");
    server.send_text(r#"{"type":"ping"}"#);
    server.send_text(r#"{"type":"result","transcription":"hello","translation":"bonjour"}"#);
    settle().await;

    assert_eq!(
        h.session.active_pair(),
        Some(LanguagePair::new(Language::ENGLISH, Language::FRENCH))
    );
    assert_eq!(h.fan_out.transcripts().translation, "bonjour\n\n");
    let message = broadcasts.try_recv().expect("one broadcast");
    assert_eq!(message.text, "bonjour");
    assert_eq!((message.from_lang.as_str(), message.to_lang.as_str()), ("en", "fr"));
    assert!(broadcasts.try_recv().is_err());
    // The malformed message did not drop the connection.
    assert_eq!(h.session.connection_state(), ConnectionState::Connected);
    h.handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_reconnecting() {
    let (connector, mut servers) = ScriptedConnector::new([]);
    let h = harness(connector.clone(), DELAY);
    let server = servers.recv().await.expect("connected");
    settle().await;

    h.handle.shutdown().await;
    assert_eq!(h.session.connection_state(), ConnectionState::Disconnected);
    assert!(server.events.is_closed());

    tokio::time::sleep(DELAY * 2).await;
    assert_eq!(connector.attempts(), 1);
}
