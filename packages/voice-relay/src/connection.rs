//! Persistent server connection with delayed reconnect.

use std::sync::Arc;

use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use voice_relay_domain::{ConnectionState, Notification, RelayError};

use crate::dispatch::InboundDispatcher;
use crate::frame::WireFrame;
use crate::retry::RetryPolicy;
use crate::session::Session;
use crate::transport::{Connector, TransportEvent};

/// What happened to a frame handed to [`FrameSink::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Not connected; the frame was discarded, not queued.
    Dropped,
}

/// Destination for outbound frames.
pub trait FrameSink: Send + Sync {
    fn send(&self, frame: WireFrame) -> SendOutcome;
}

type Outbound = Arc<Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>>;

/// Handle to the connection manager task.
pub struct ConnectionHandle {
    session: Arc<Session>,
    outbound: Outbound,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionHandle {
    /// Start connecting in the background.
    pub fn spawn(
        session: Arc<Session>,
        connector: Arc<dyn Connector>,
        retry: Arc<dyn RetryPolicy>,
        dispatcher: InboundDispatcher,
    ) -> Self {
        let outbound = Outbound::default();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let manager = ConnectionManager {
            session: session.clone(),
            connector,
            retry,
            dispatcher,
            outbound: outbound.clone(),
        };
        let task = tokio::spawn(manager.run(shutdown_rx));
        Self {
            session,
            outbound,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.session.connection_state()
    }

    /// Stop reconnecting, close the socket, and wait for the task to exit.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "connection task ended abnormally");
            }
        }
    }
}

impl FrameSink for ConnectionHandle {
    fn send(&self, frame: WireFrame) -> SendOutcome {
        if self.session.connection_state().is_connected() {
            let len = frame.len();
            let sent = self
                .outbound
                .lock()
                .as_ref()
                .is_some_and(|tx| tx.unbounded_send(frame.into_bytes()).is_ok());
            if sent {
                tracing::debug!(bytes = len, "sent audio frame");
                return SendOutcome::Sent;
            }
        }
        tracing::warn!(error = %RelayError::ConnectionLost, "dropping audio frame");
        self.session
            .notify(Notification::warning("Connection lost; utterance not sent"));
        SendOutcome::Dropped
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

struct ConnectionManager {
    session: Arc<Session>,
    connector: Arc<dyn Connector>,
    retry: Arc<dyn RetryPolicy>,
    dispatcher: InboundDispatcher,
    outbound: Outbound,
}

enum LinkEnd {
    Closed,
    Shutdown,
}

impl ConnectionManager {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut attempt: u32 = 0;
        loop {
            self.session.set_connection_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(link) => {
                    attempt = 0;
                    *self.outbound.lock() = Some(link.outbound);
                    self.session.set_connection_state(ConnectionState::Connected);
                    self.session
                        .notify(Notification::success("Connected to server"));

                    let end = self.read_inbound(link.inbound, &mut shutdown).await;
                    self.outbound.lock().take();
                    self.session.set_connection_state(ConnectionState::Disconnected);
                    if let LinkEnd::Shutdown = end {
                        break;
                    }
                    self.session.notify(Notification::error(
                        "Disconnected from server. Reconnecting...",
                    ));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "connect failed");
                    self.session.set_connection_state(ConnectionState::Disconnected);
                    self.session
                        .notify(Notification::error("Error connecting to server"));
                }
            }

            attempt = attempt.saturating_add(1);
            let Some(delay) = self.retry.next_delay(attempt) else {
                tracing::warn!(attempt, "retry policy exhausted");
                self.session
                    .notify(Notification::error("Giving up on reconnecting to server"));
                break;
            };
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.outbound.lock().take();
        self.session.set_connection_state(ConnectionState::Disconnected);
        tracing::debug!("connection manager stopped");
    }

    /// Process inbound events in arrival order until the link ends.
    async fn read_inbound(
        &self,
        mut inbound: BoxStream<'static, TransportEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> LinkEnd {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.changed() => return LinkEnd::Shutdown,
                event = inbound.next() => event,
            };
            match event {
                Some(TransportEvent::Text(text)) => self.dispatcher.dispatch_text(&text),
                Some(TransportEvent::Binary(bytes)) => self.dispatcher.dispatch_binary(&bytes),
                Some(TransportEvent::Closed(reason)) => {
                    tracing::info!(?reason, "server closed the connection");
                    return LinkEnd::Closed;
                }
                Some(TransportEvent::Error(error)) => {
                    tracing::warn!(%error, "connection error");
                    return LinkEnd::Closed;
                }
                None => {
                    tracing::info!("connection stream ended");
                    return LinkEnd::Closed;
                }
            }
        }
    }
}
