//! Socket seam between the connection manager and the network.

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{Connector as TlsConnector, connect_async_tls_with_config};
use voice_relay_domain::RelayError;

/// Something that arrived on an open link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Binary(Vec<u8>),
    /// The peer closed the link, with its reason if one was given.
    Closed(Option<String>),
    Error(String),
}

/// An open, bidirectional link to the server.
///
/// Dropping `outbound` closes the link from this side. The link is also
/// considered closed when `inbound` ends.
pub struct Link {
    pub outbound: mpsc::UnboundedSender<Vec<u8>>,
    pub inbound: BoxStream<'static, TransportEvent>,
}

/// Opens links to the recognition service.
pub trait Connector: Send + Sync {
    fn connect(&self) -> BoxFuture<'static, Result<Link, RelayError>>;
}

/// WebSocket connector built on tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    accept_invalid_certs: bool,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accept_invalid_certs: false,
        }
    }

    /// Trust self-signed server certificates.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn tls(&self) -> Result<Option<TlsConnector>, RelayError> {
        if !self.accept_invalid_certs {
            return Ok(None);
        }
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| RelayError::Transport(format!("failed to build TLS connector: {e}")))?;
        Ok(Some(TlsConnector::NativeTls(connector)))
    }
}

impl Connector for WebSocketConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Link, RelayError>> {
        let url = self.url.clone();
        let tls = self.tls();
        async move {
            let tls = tls?;
            tracing::info!(%url, "attempting to connect");
            let (socket, _response) = connect_async_tls_with_config(url.as_str(), None, false, tls)
                .await
                .map_err(|e| RelayError::Transport(e.to_string()))?;
            let (mut writer, reader) = socket.split();

            let (outbound, mut frames) = mpsc::unbounded::<Vec<u8>>();
            tokio::spawn(async move {
                while let Some(frame) = frames.next().await {
                    let len = frame.len();
                    if let Err(e) = writer.send(Message::binary(frame)).await {
                        tracing::warn!(error = %e, "failed to write frame");
                        break;
                    }
                    tracing::trace!(bytes = len, "frame written");
                }
                let _ = writer.close().await;
            });

            let inbound = reader
                .filter_map(|message| async move {
                    match message {
                        Ok(Message::Text(text)) => {
                            Some(TransportEvent::Text(text.as_str().to_owned()))
                        }
                        Ok(Message::Binary(bytes)) => Some(TransportEvent::Binary(bytes.to_vec())),
                        Ok(Message::Close(frame)) => {
                            Some(TransportEvent::Closed(frame.map(|f| f.reason.to_string())))
                        }
                        // Ping/pong is answered by tungstenite itself.
                        Ok(_) => None,
                        Err(e) => Some(TransportEvent::Error(e.to_string())),
                    }
                })
                .boxed();

            Ok(Link { outbound, inbound })
        }
        .boxed()
    }
}
