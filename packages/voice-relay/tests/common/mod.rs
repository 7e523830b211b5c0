#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc as tokio_mpsc};
use voice_relay::domain::{ConnectionState, Notification, RelayError};
use voice_relay::{AudioCapture, AudioSource, Connector, Link, SessionEvent, TransportEvent};

/// The server side of one scripted link.
pub struct ServerEnd {
    pub events: mpsc::UnboundedSender<TransportEvent>,
    pub frames: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl ServerEnd {
    pub fn send_text(&self, text: &str) {
        self.events
            .unbounded_send(TransportEvent::Text(text.to_string()))
            .expect("client still reading");
    }

    pub fn close(&self) {
        self.events
            .unbounded_send(TransportEvent::Closed(None))
            .expect("client still reading");
    }

    pub async fn next_frame(&mut self) -> Vec<u8> {
        self.frames.next().await.expect("client sent a frame")
    }
}

/// Hands each successful link's server end to the test.
pub struct ScriptedConnector {
    /// `false` entries make the matching attempt fail; empty means succeed.
    script: Mutex<VecDeque<bool>>,
    attempts: AtomicUsize,
    servers: tokio_mpsc::UnboundedSender<ServerEnd>,
}

impl ScriptedConnector {
    pub fn new(
        script: impl IntoIterator<Item = bool>,
    ) -> (Arc<Self>, tokio_mpsc::UnboundedReceiver<ServerEnd>) {
        let (servers, rx) = tokio_mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            attempts: AtomicUsize::new(0),
            servers,
        });
        (connector, rx)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Link, RelayError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let succeed = self.script.lock().pop_front().unwrap_or(true);
        if !succeed {
            return async { Err(RelayError::Transport("connection refused".into())) }.boxed();
        }
        let (outbound, frames) = mpsc::unbounded();
        let (events, inbound) = mpsc::unbounded();
        let _ = self.servers.send(ServerEnd { events, frames });
        async move {
            Ok(Link {
                outbound,
                inbound: inbound.boxed(),
            })
        }
        .boxed()
    }
}

/// A connector that never finishes connecting.
pub struct StalledConnector;

impl Connector for StalledConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Link, RelayError>> {
        futures::future::pending().boxed()
    }
}

/// Audio source that replays fixed chunks and records its lifecycle.
#[derive(Default)]
pub struct ScriptedSource {
    pub chunks: Vec<Vec<f32>>,
    pub opens: Arc<AtomicUsize>,
    pub released: Arc<AtomicBool>,
    pub deny: bool,
}

impl AudioSource for ScriptedSource {
    fn describe(&self) -> String {
        "scripted source".to_string()
    }

    fn open(&mut self) -> Result<AudioCapture, RelayError> {
        if self.deny {
            return Err(RelayError::PermissionDenied("denied by test".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.released.store(false, Ordering::SeqCst);
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        for chunk in &self.chunks {
            let _ = tx.send(chunk.clone());
        }
        let released = self.released.clone();
        // Holding the sender keeps the stream open until released.
        Ok(AudioCapture::new(rx, move || {
            drop(tx);
            released.store(true, Ordering::SeqCst);
        }))
    }
}

pub const FRAME: usize = 1536;

pub fn tone(frames: usize) -> Vec<f32> {
    (0..frames * FRAME)
        .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16000.0).sin() * 0.3)
        .collect()
}

pub fn silence(frames: usize) -> Vec<f32> {
    vec![0.0; frames * FRAME]
}

/// Let spawned tasks run; advances paused time by a negligible amount.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub fn states(events: &[SessionEvent]) -> Vec<ConnectionState> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Connection(state) => Some(*state),
            _ => None,
        })
        .collect()
}

pub fn statuses(events: &[SessionEvent]) -> Vec<Notification> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Status(notification) => Some(notification.clone()),
            _ => None,
        })
        .collect()
}
