//! Start/stop orchestration and the capture pump.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use voice_relay_domain::{AudioMetadata, Notification, RelayError, Utterance};
use voice_relay_vad::{SegmentEvent, VoiceSegmenter};

use crate::audio_io::{AudioSource, CaptureRelease};
use crate::connection::{FrameSink, SendOutcome};
use crate::encoder::encode;
use crate::fan_out::ResultFanOut;
use crate::frame::build_frame;
use crate::session::Session;

struct Running {
    stop: oneshot::Sender<()>,
    release: CaptureRelease,
    pump: JoinHandle<()>,
}

/// Wires capture, segmentation, framing and sending together.
pub struct Pipeline {
    session: Arc<Session>,
    sink: Arc<dyn FrameSink>,
    fan_out: Arc<ResultFanOut>,
    segmenter: Arc<Mutex<VoiceSegmenter>>,
    source: Mutex<Box<dyn AudioSource>>,
    running: Mutex<Option<Running>>,
    offload: bool,
}

impl Pipeline {
    pub fn new(
        session: Arc<Session>,
        sink: Arc<dyn FrameSink>,
        fan_out: Arc<ResultFanOut>,
        segmenter: VoiceSegmenter,
        source: Box<dyn AudioSource>,
    ) -> Self {
        Self {
            session,
            sink,
            fan_out,
            segmenter: Arc::new(Mutex::new(segmenter)),
            source: Mutex::new(source),
            running: Mutex::new(None),
            offload: false,
        }
    }

    /// Run detector inference on the blocking pool instead of the async
    /// worker. Worth it for model-backed detectors.
    pub fn offload_inference(mut self, offload: bool) -> Self {
        self.offload = offload;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn fan_out(&self) -> &Arc<ResultFanOut> {
        &self.fan_out
    }

    /// Begin listening. Does nothing if already listening.
    ///
    /// On failure everything acquired so far is released and the pipeline
    /// stays stopped.
    pub fn start(&self) -> Result<(), RelayError> {
        if self.session.is_listening() {
            tracing::debug!("already listening");
            return Ok(());
        }

        let capture = {
            let mut source = self.source.lock();
            tracing::info!(source = %source.describe(), "opening audio source");
            source.open()
        };
        let capture = match capture {
            Ok(capture) => capture,
            Err(err) => {
                self.session
                    .notify(Notification::error(format!("Error starting voice detection: {err}")));
                return Err(err);
            }
        };

        let ready = {
            let mut segmenter = self.segmenter.lock();
            segmenter.init().and_then(|()| segmenter.start())
        };
        if let Err(err) = ready {
            let err = RelayError::from(err);
            drop(capture);
            self.session
                .notify(Notification::error(format!("Error initializing voice detection: {err}")));
            return Err(err);
        }

        let (chunks, release) = capture.into_parts();
        let (stop, stopped) = oneshot::channel();
        let pump = tokio::spawn(pump(
            chunks,
            stopped,
            self.segmenter.clone(),
            self.session.clone(),
            self.sink.clone(),
            self.offload,
        ));
        // A previous pump that ended on its own is replaced here.
        *self.running.lock() = Some(Running {
            stop,
            release,
            pump,
        });
        self.session.set_listening(true);
        self.session.notify(Notification::success("Ready"));
        Ok(())
    }

    /// Stop listening and release the audio source.
    ///
    /// The connection and the loaded detector are untouched, and a frame
    /// already handed to the sink is not recalled.
    pub fn stop(&self) {
        let running = self.running.lock().take();
        self.segmenter.lock().pause();
        if let Some(Running {
            stop,
            release,
            pump,
        }) = running
        {
            let _ = stop.send(());
            drop(release);
            drop(pump);
        }
        if self.session.is_listening() {
            self.session.set_listening(false);
            self.session.notify(Notification::info("Stopped"));
        }
    }

    /// Empty both transcripts.
    pub fn clear(&self) {
        self.fan_out.clear();
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.stop.send(());
        }
    }
}

async fn pump(
    mut chunks: mpsc::UnboundedReceiver<Vec<f32>>,
    mut stopped: oneshot::Receiver<()>,
    segmenter: Arc<Mutex<VoiceSegmenter>>,
    session: Arc<Session>,
    sink: Arc<dyn FrameSink>,
    offload: bool,
) {
    loop {
        let chunk = tokio::select! {
            biased;
            _ = &mut stopped => return,
            chunk = chunks.recv() => chunk,
        };
        let Some(chunk) = chunk else {
            tracing::info!("audio source ended");
            segmenter.lock().pause();
            session.set_listening(false);
            session.notify(Notification::info("Stopped"));
            return;
        };

        let events = if offload {
            let segmenter = segmenter.clone();
            tokio::task::spawn_blocking(move || segmenter.lock().process(&chunk))
                .await
                .map_err(|e| RelayError::AudioProcessing(e.to_string()))
                .and_then(|events| events.map_err(RelayError::from))
        } else {
            segmenter.lock().process(&chunk).map_err(RelayError::from)
        };
        let events = match events {
            Ok(events) => events,
            Err(err) => {
                tracing::warn!(error = %err, "segmentation failed");
                session.notify(Notification::error(format!("Voice detection error: {err}")));
                continue;
            }
        };

        for event in events {
            match event {
                SegmentEvent::SpeechStart => session.notify(Notification::info("Listening...")),
                SegmentEvent::Misfire => session.notify(Notification::success("Ready")),
                SegmentEvent::SpeechEnd(utterance) => {
                    session.notify(Notification::info("Processing..."));
                    send_utterance(&session, sink.as_ref(), &utterance);
                }
            }
        }
    }
}

/// Encode and send one utterance under the currently selected pair.
pub fn send_utterance(
    session: &Session,
    sink: &dyn FrameSink,
    utterance: &Utterance,
) -> SendOutcome {
    let Some(pair) = session.active_pair() else {
        tracing::warn!(samples = utterance.len(), "no language pair selected");
        session.notify(Notification::warning(
            "No language pair selected; utterance not sent",
        ));
        return SendOutcome::Dropped;
    };
    let frame = build_frame(&AudioMetadata::new(pair), &encode(utterance));
    tracing::debug!(
        pair = %pair,
        samples = utterance.len(),
        duration_ms = utterance.duration_ms(),
        "sending utterance"
    );
    sink.send(frame)
}
