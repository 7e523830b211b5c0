//! Assembles a running relay from configuration.

use std::sync::Arc;

use tokio::task::JoinHandle;
use voice_relay_domain::RelayError;
use voice_relay_vad::{DetectorBackend, VoiceSegmenter};

use crate::audio_io::AudioSource;
use crate::config::RelayConfig;
use crate::connection::ConnectionHandle;
use crate::dispatch::InboundDispatcher;
use crate::fan_out::{ResultFanOut, spawn_udp_forwarder};
use crate::pipeline::Pipeline;
use crate::session::Session;
use crate::transport::Connector;

/// One session: connection, pipeline, and optional broadcast forwarder.
pub struct Relay {
    session: Arc<Session>,
    connection: Arc<ConnectionHandle>,
    pipeline: Pipeline,
    forwarder: Option<JoinHandle<()>>,
}

impl Relay {
    /// Start connecting and get ready to listen. Must run inside a tokio runtime.
    pub fn launch(
        config: &RelayConfig,
        connector: Arc<dyn Connector>,
        source: Box<dyn AudioSource>,
    ) -> Result<Self, RelayError> {
        let segmenter = VoiceSegmenter::new(config.segmenter, config.detector.clone())?;
        let session = Arc::new(Session::new());
        let fan_out = Arc::new(ResultFanOut::new(session.clone()));
        let forwarder = config
            .broadcast
            .udp_target
            .map(|target| spawn_udp_forwarder(fan_out.subscribe(), target));

        let dispatcher = InboundDispatcher::new(session.clone(), fan_out.clone());
        let connection = Arc::new(ConnectionHandle::spawn(
            session.clone(),
            connector,
            config.server.reconnect.policy(),
            dispatcher,
        ));
        let pipeline = Pipeline::new(
            session.clone(),
            connection.clone(),
            fan_out,
            segmenter,
            source,
        )
        .offload_inference(matches!(config.detector, DetectorBackend::Silero { .. }));
        Ok(Self {
            session,
            connection,
            pipeline,
            forwarder,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Stop listening, close the connection, and stop forwarding.
    pub async fn shutdown(self) {
        self.pipeline.stop();
        self.connection.shutdown().await;
        drop(self.pipeline);
        if let Some(forwarder) = self.forwarder {
            // The forwarder ends once the last broadcast sender is gone.
            if let Err(e) = forwarder.await {
                tracing::warn!(error = %e, "broadcast forwarder ended abnormally");
            }
        }
        tracing::info!("relay shut down");
    }
}
