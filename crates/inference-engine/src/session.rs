//! Classification session: resample, invoke, select, label

use std::path::Path;

use image_input::RawImage;
use serde::{Deserialize, Serialize};
use tensor_ops::{resample, select_top_k, TensorLayout};
use tracing::{debug, info, warn};

use crate::engine::{InferenceEngine, OrtEngine};
use crate::labels::Labels;
use crate::{InferenceError, LoadError, SessionConfig};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded yet, or the label file could not be read
    Unloaded,
    /// Model, engine and labels ready
    Loaded,
    /// Labels were read but the model or engine failed
    FailedLoad,
}

/// One selected class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Position in the output tensor
    pub index: usize,
    /// Dequantized score
    pub confidence: f32,
    /// Label bound to `index`
    pub label: String,
}

/// Owns the engine and label table for one model.
///
/// Not meant for concurrent use: the engine's tensors are reused in place
/// across calls, so callers serialize calls or keep one session per thread.
pub struct InferenceSession<E = OrtEngine> {
    config: SessionConfig,
    state: SessionState,
    engine: Option<E>,
    labels: Labels,
}

impl<E> InferenceSession<E> {
    /// Create an unloaded session
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Unloaded,
            engine: None,
            labels: Labels::default(),
        }
    }

    /// Minimum confidence, applied from the next call on
    pub fn set_threshold(&mut self, value: f32) {
        self.config.threshold = value;
    }

    /// Maximum result count, applied from the next call on
    pub fn set_num_results(&mut self, value: usize) {
        self.config.num_results = value;
    }

    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    pub fn num_results(&self) -> usize {
        self.config.num_results
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }
}

impl Default for InferenceSession<OrtEngine> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl InferenceSession<OrtEngine> {
    /// Load labels and an ONNX model
    pub fn load(&mut self, model_path: impl AsRef<Path>, labels_path: impl AsRef<Path>) -> Result<(), LoadError> {
        let model_path = model_path.as_ref();
        self.load_with(labels_path, |config| OrtEngine::load(model_path, config))
    }
}

impl<E: InferenceEngine> InferenceSession<E> {
    /// Load labels, then build the engine with `build`
    pub fn load_with<F>(&mut self, labels_path: impl AsRef<Path>, build: F) -> Result<(), LoadError>
    where
        F: FnOnce(&SessionConfig) -> Result<E, LoadError>,
    {
        self.state = SessionState::Unloaded;
        self.engine = None;

        self.labels = Labels::from_file(labels_path)?;

        match build(&self.config) {
            Ok(engine) => {
                info!("Session loaded with {} labels", self.labels.len());
                self.engine = Some(engine);
                self.state = SessionState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::FailedLoad;
                Err(e)
            }
        }
    }

    /// Decode and classify an image file; empty on any failure
    pub fn run_inference_path(&mut self, path: impl AsRef<Path>) -> Vec<ClassificationResult> {
        let path = path.as_ref();
        match RawImage::from_path(path) {
            Ok(image) => self.run_inference(&image),
            Err(e) => {
                warn!("Failed to load image {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Classify a decoded image; empty on any failure.
    ///
    /// An empty result does not distinguish "nothing above threshold" from
    /// an internal error; use [`Self::try_run_inference`] for that.
    pub fn run_inference(&mut self, image: &RawImage) -> Vec<ClassificationResult> {
        self.try_run_inference(image).unwrap_or_else(|e| {
            warn!("Inference failed: {}", e);
            Vec::new()
        })
    }

    /// Classify a decoded image, reporting why a call failed
    pub fn try_run_inference(&mut self, image: &RawImage) -> Result<Vec<ClassificationResult>, InferenceError> {
        if self.state != SessionState::Loaded {
            return Err(InferenceError::NotLoaded);
        }
        let engine = self.engine.as_mut().ok_or(InferenceError::NotLoaded)?;
        let layout = self.config.layout;

        engine.allocate()?;

        let input = engine.describe_input()?;
        let (height, width, channels) = input.image_dims(layout)?;

        let mut tensor = resample(image, height, width, channels, &input.dtype)?;
        if layout == TensorLayout::Nchw {
            tensor = tensor.hwc_to_chw(height, width, channels)?;
        }

        engine.write_input(tensor)?;
        engine.invoke()?;

        let output = engine.describe_output()?;
        let classes = output.last_dim().ok_or_else(|| InferenceError::InvalidInputShape {
            expected: "output of rank >= 1".to_string(),
            actual: format!("{:?}", output.dims),
        })?;

        let scores = engine.read_output()?;
        let selected = select_top_k(
            scores,
            classes,
            self.config.num_results,
            self.config.threshold,
            &output.dtype,
        )?;
        debug!("{} of {} classes selected", selected.len(), classes);

        selected
            .into_iter()
            .map(|s| {
                Ok(ClassificationResult {
                    index: s.index,
                    confidence: s.score,
                    label: self.labels.get(s.index)?.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngine;
    use std::io::Write;
    use tensor_ops::{ElementType, TensorData, TensorSpec};

    fn labels_file(count: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..count {
            writeln!(file, "class_{}", i).unwrap();
        }
        file
    }

    fn mock(input: TensorSpec, scores: TensorData) -> MockEngine {
        let output = TensorSpec::new(vec![1, scores.len()], scores.element_type());
        MockEngine::new(input, output, scores)
    }

    fn loaded(engine: MockEngine, labels: usize) -> InferenceSession<MockEngine> {
        let file = labels_file(labels);
        let mut session = InferenceSession::new(SessionConfig::default());
        session.load_with(file.path(), |_| Ok(engine)).unwrap();
        session
    }

    #[test]
    fn test_not_loaded() {
        let mut session: InferenceSession<MockEngine> = InferenceSession::new(SessionConfig::default());
        let image = RawImage::filled(2, 2, [0, 0, 0]).unwrap();
        assert!(matches!(session.try_run_inference(&image), Err(InferenceError::NotLoaded)));
        assert!(session.run_inference(&image).is_empty());
    }

    #[test]
    fn test_engine_failure_marks_failed_load() {
        let file = labels_file(3);
        let mut session: InferenceSession<MockEngine> = InferenceSession::new(SessionConfig::default());
        let result = session.load_with(file.path(), |_| Err(LoadError::InterpreterBuild("boom".into())));
        assert!(result.is_err());
        assert_eq!(session.state(), SessionState::FailedLoad);
    }

    #[test]
    fn test_uint8_pipeline() {
        let input = TensorSpec::new(vec![1, 4, 4, 3], ElementType::U8);
        let engine = mock(input, TensorData::U8(vec![0, 200, 255, 10]));
        let mut session = loaded(engine, 4);
        session.set_num_results(2);
        session.set_threshold(0.1);

        let image = RawImage::filled(8, 8, [255, 255, 255]).unwrap();
        let results = session.try_run_inference(&image).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 2);
        assert_eq!(results[0].label, "class_2");
        assert_eq!(results[0].confidence, 1.0);
        assert_eq!(results[1].index, 1);

        let written = session.engine().unwrap().last_input().unwrap();
        assert_eq!(written, &TensorData::U8(vec![255; 48]));
    }

    #[test]
    fn test_nchw_input_is_planar() {
        let input = TensorSpec::new(vec![1, 3, 2, 2], ElementType::U8);
        let engine = mock(input, TensorData::F32(vec![0.9]));
        let file = labels_file(1);
        let mut session = InferenceSession::new(SessionConfig::nchw());
        session.load_with(file.path(), |_| Ok(engine)).unwrap();

        let image = RawImage::filled(2, 2, [1, 2, 3]).unwrap();
        let results = session.try_run_inference(&image).unwrap();
        assert_eq!(results.len(), 1);

        let written = session.engine().unwrap().last_input().unwrap();
        assert_eq!(written, &TensorData::U8(vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]));
    }

    #[test]
    fn test_label_out_of_range() {
        let input = TensorSpec::new(vec![1, 2, 2, 3], ElementType::F32);
        let engine = mock(input, TensorData::F32(vec![0.1, 0.2, 0.95]));
        let mut session = loaded(engine, 2);

        let image = RawImage::filled(2, 2, [9, 9, 9]).unwrap();
        assert!(matches!(
            session.try_run_inference(&image),
            Err(InferenceError::OutOfRangeLabel { index: 2, count: 2 })
        ));
        assert!(session.run_inference(&image).is_empty());
    }

    #[test]
    fn test_unsupported_input_type_fails_closed() {
        let input = TensorSpec::new(vec![1, 2, 2, 3], ElementType::Unsupported("float16".into()));
        let engine = mock(input, TensorData::F32(vec![0.9]));
        let mut session = loaded(engine, 1);

        let image = RawImage::filled(2, 2, [9, 9, 9]).unwrap();
        assert!(matches!(
            session.try_run_inference(&image),
            Err(InferenceError::UnsupportedDtype(_))
        ));
        assert!(session.run_inference(&image).is_empty());
    }
}
