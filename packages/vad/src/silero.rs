use ort::{session::Session, session::builder::GraphOptimizationLevel, value::TensorRef};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::{detector::SpeechDetector, error::Error};

/// A Silero (v4) voice activity detector session.
///
/// The ONNX model is read from disk when the detector is built; a missing or
/// unreadable model is reported as [`Error::DependencyUnavailable`].
#[derive(Debug)]
pub struct SileroDetector {
    session: Session,
    chunk_size: usize,
    sample_rate: i64,
    h: ndarray::Array3<f32>,
    c: ndarray::Array3<f32>,
}

fn create_session(model_path: &Path) -> Result<Session, Error> {
    if !model_path.is_file() {
        return Err(Error::DependencyUnavailable(format!(
            "silero model not found at {}",
            model_path.display()
        )));
    }
    Session::builder()
        .map_err(unavailable("failed to create session builder"))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(unavailable("failed to set optimization level"))?
        .with_intra_threads(1)
        .map_err(unavailable("failed to set intra threads"))?
        .with_inter_threads(1)
        .map_err(unavailable("failed to set inter threads"))?
        .commit_from_file(model_path)
        .map_err(unavailable("failed to load model"))
}

fn unavailable<E: Display>(stage: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::DependencyUnavailable(format!("{stage}: {e}"))
}

fn tensor_failed<E: Display>(e: E) -> Error {
    Error::PredictionFailed(format!("failed to create tensor: {e}"))
}

impl SileroDetector {
    /// Create a new [SileroDetectorBuilder].
    pub fn builder() -> SileroDetectorBuilder {
        SileroDetectorConfig::builder()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Predicts the existence of speech in one chunk of audio.
    ///
    /// The chunk is zero-padded if it is too short, or truncated if it is too long.
    pub fn predict(&mut self, samples: &[f32]) -> Result<f32, Error> {
        let mut input = ndarray::Array2::<f32>::zeros((1, self.chunk_size));
        for (i, sample) in samples.iter().take(self.chunk_size).enumerate() {
            input[[0, i]] = *sample;
        }

        let sample_rate = ndarray::arr1::<i64>(&[self.sample_rate]);

        let input_tensor = TensorRef::from_array_view(input.view()).map_err(tensor_failed)?;
        let sr_tensor = TensorRef::from_array_view(sample_rate.view()).map_err(tensor_failed)?;
        let h_tensor = TensorRef::from_array_view(self.h.view()).map_err(tensor_failed)?;
        let c_tensor = TensorRef::from_array_view(self.c.view()).map_err(tensor_failed)?;

        let inputs = ort::inputs![
            "input" => input_tensor,
            "sr" => sr_tensor,
            "h" => h_tensor,
            "c" => c_tensor,
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::PredictionFailed(e.to_string()))?;

        let state = |name: &str| -> Result<ndarray::Array3<f32>, Error> {
            outputs
                .get(name)
                .ok_or_else(|| Error::PredictionFailed(format!("missing '{name}' output")))?
                .try_extract_array::<f32>()
                .map_err(|e| Error::PredictionFailed(format!("failed to extract {name}: {e}")))?
                .into_dimensionality::<ndarray::Ix3>()
                .map(|view| view.to_owned())
                .map_err(|e| Error::PredictionFailed(format!("failed to reshape {name}: {e}")))
        };
        let hn = state("hn")?;
        let cn = state("cn")?;

        let probability = outputs
            .get("output")
            .ok_or_else(|| Error::PredictionFailed("missing 'output' output".to_string()))?
            .try_extract_array::<f32>()
            .map_err(|e| Error::PredictionFailed(format!("failed to extract output: {e}")))?
            .iter()
            .next()
            .copied()
            .ok_or_else(|| Error::PredictionFailed("empty 'output' tensor".to_string()))?;

        self.h.assign(&hn);
        self.c.assign(&cn);

        Ok(probability)
    }
}

impl SpeechDetector for SileroDetector {
    fn name(&self) -> &str {
        "silero"
    }

    fn speech_probability(&mut self, frame: &[f32]) -> Result<f32, Error> {
        self.predict(frame)
    }

    fn reset(&mut self) {
        self.h.fill(0f32);
        self.c.fill(0f32);
    }
}

/// The configuration for the [SileroDetector]. Used to create a
/// [SileroDetectorBuilder] that performs runtime validation on build.
#[derive(Debug, typed_builder::TypedBuilder)]
#[builder(
    builder_method(vis = ""),
    builder_type(name = SileroDetectorBuilder, vis = "pub"),
    build_method(into = Result<SileroDetector, Error>, vis = "pub"))
]
struct SileroDetectorConfig {
    #[builder(setter(into))]
    model_path: PathBuf,
    #[builder(setter(into))]
    chunk_size: usize,
    #[builder(setter(into))]
    sample_rate: i64,
}

impl From<SileroDetectorConfig> for Result<SileroDetector, Error> {
    fn from(value: SileroDetectorConfig) -> Self {
        if (value.sample_rate as f32) / (value.chunk_size as f32) > 31.25 {
            return Err(Error::VadConfigError {
                sample_rate: value.sample_rate,
                chunk_size: value.chunk_size,
            });
        }

        let session = create_session(&value.model_path)?;
        tracing::info!(model = %value.model_path.display(), "silero detector loaded");

        Ok(SileroDetector {
            session,
            chunk_size: value.chunk_size,
            sample_rate: value.sample_rate,
            h: ndarray::Array3::<f32>::zeros((2, 1, 64)),
            c: ndarray::Array3::<f32>::zeros((2, 1, 64)),
        })
    }
}
