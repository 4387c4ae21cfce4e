//! End-to-end classification against a scripted engine

use std::io::Write;

use image::{Rgb, RgbImage};
use image_input::RawImage;
use inference_engine::{
    InferenceError, InferenceSession, LoadError, MockEngine, SessionConfig, SessionState,
};
use tempfile::{NamedTempFile, TempDir};
use tensor_ops::{ElementType, TensorData, TensorSpec};

const CLASSES: usize = 1001;

fn imagenet_labels() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..CLASSES {
        writeln!(file, "label {}", i).unwrap();
    }
    file
}

fn fixture_scores() -> Vec<f32> {
    let mut scores = vec![0.0f32; CLASSES];
    for (index, score) in [(866, 0.87), (112, 0.65), (3, 0.40), (999, 0.12), (4, 0.02), (0, 0.0009)] {
        scores[index] = score;
    }
    scores
}

fn mobilenet_mock(scores: Vec<f32>) -> MockEngine {
    MockEngine::new(
        TensorSpec::new(vec![1, 224, 224, 3], ElementType::U8),
        TensorSpec::new(vec![1, CLASSES], ElementType::F32),
        TensorData::F32(scores),
    )
}

fn session_with(engine: MockEngine) -> (InferenceSession<MockEngine>, NamedTempFile) {
    let labels = imagenet_labels();
    let mut session = InferenceSession::new(SessionConfig::default());
    session.set_threshold(0.01);
    session.set_num_results(5);
    session.load_with(labels.path(), |_| Ok(engine)).unwrap();
    (session, labels)
}

fn fixture_image() -> RawImage {
    RawImage::filled(320, 240, [120, 80, 40]).unwrap()
}

#[test]
fn test_top_five_above_threshold() {
    let (mut session, _labels) = session_with(mobilenet_mock(fixture_scores()));
    assert_eq!(session.state(), SessionState::Loaded);
    assert_eq!(session.labels().len(), CLASSES);

    let results = session.run_inference(&fixture_image());

    let pairs: Vec<(usize, f32)> = results.iter().map(|r| (r.index, r.confidence)).collect();
    assert_eq!(
        pairs,
        vec![(866, 0.87), (112, 0.65), (3, 0.40), (999, 0.12), (4, 0.02)]
    );
    assert_eq!(results[0].label, "label 866");
    assert_eq!(results[4].label, "label 4");
}

#[test]
fn test_zero_results_requested() {
    let (mut session, _labels) = session_with(mobilenet_mock(fixture_scores()));
    session.set_num_results(0);

    assert!(session.try_run_inference(&fixture_image()).unwrap().is_empty());
}

#[test]
fn test_tunables_apply_to_next_call() {
    let (mut session, _labels) = session_with(mobilenet_mock(fixture_scores()));
    assert_eq!(session.run_inference(&fixture_image()).len(), 5);

    session.set_num_results(3);
    assert_eq!(session.num_results(), 3);
    assert_eq!(session.config().num_results, 3);
    assert_eq!(session.run_inference(&fixture_image()).len(), 3);

    session.set_num_results(5);
    session.set_threshold(0.5);
    assert_eq!(session.threshold(), 0.5);
    assert_eq!(session.config().threshold, 0.5);
    let results = session.run_inference(&fixture_image());
    assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), vec![866, 112]);

    session.set_threshold(1.5);
    assert!(session.run_inference(&fixture_image()).is_empty());
}

#[test]
fn test_unreadable_labels_leave_session_unloaded() {
    let mut session: InferenceSession<MockEngine> = InferenceSession::new(SessionConfig::default());
    let mut engine_built = false;

    let result = session.load_with("/nonexistent/labels.txt", |_| {
        engine_built = true;
        Ok(mobilenet_mock(fixture_scores()))
    });

    assert!(matches!(result, Err(LoadError::LabelFile { .. })));
    assert!(!engine_built);
    assert_eq!(session.state(), SessionState::Unloaded);
    assert!(session.labels().is_empty());
    assert!(matches!(
        session.try_run_inference(&fixture_image()),
        Err(InferenceError::NotLoaded)
    ));
}

#[test]
fn test_undecodable_image_does_not_stop_processing() {
    let (mut session, _labels) = session_with(mobilenet_mock(fixture_scores()));
    let dir = TempDir::new().unwrap();

    let broken = dir.path().join("broken.jpg");
    std::fs::write(&broken, b"\xff\xd8 truncated jpeg").unwrap();
    let good = dir.path().join("good.png");
    RgbImage::from_pixel(64, 48, Rgb([10, 20, 30])).save(&good).unwrap();

    assert!(session.run_inference_path(&broken).is_empty());
    assert!(session.run_inference_path(dir.path().join("missing.png")).is_empty());
    assert_eq!(session.run_inference_path(&good).len(), 5);
    assert_eq!(session.engine().unwrap().invocations(), 1);
}

#[test]
fn test_runtime_failures_fail_closed() {
    let (mut session, _labels) = session_with(mobilenet_mock(fixture_scores()).failing_invocation());
    assert!(matches!(
        session.try_run_inference(&fixture_image()),
        Err(InferenceError::Invocation(_))
    ));
    assert!(session.run_inference(&fixture_image()).is_empty());

    let (mut session, _labels) = session_with(mobilenet_mock(fixture_scores()).failing_allocation());
    assert!(matches!(
        session.try_run_inference(&fixture_image()),
        Err(InferenceError::Allocation(_))
    ));
}

#[test]
fn test_unsupported_output_type_fails_closed() {
    let engine = MockEngine::new(
        TensorSpec::new(vec![1, 224, 224, 3], ElementType::F32),
        TensorSpec::new(vec![1, CLASSES], ElementType::Unsupported("int64".into())),
        TensorData::F32(fixture_scores()),
    );
    let (mut session, _labels) = session_with(engine);

    assert!(matches!(
        session.try_run_inference(&fixture_image()),
        Err(InferenceError::UnsupportedDtype(_))
    ));
    assert!(session.run_inference(&fixture_image()).is_empty());
}

#[test]
fn test_quantized_int8_model() {
    let mut scores = vec![-128i8; CLASSES];
    scores[42] = 127;
    scores[7] = 0;
    let engine = MockEngine::new(
        TensorSpec::new(vec![1, 8, 8, 3], ElementType::I8),
        TensorSpec::new(vec![1, CLASSES], ElementType::I8),
        TensorData::I8(scores),
    );
    let (mut session, _labels) = session_with(engine);

    let results = session.run_inference(&RawImage::filled(16, 16, [255, 255, 255]).unwrap());
    assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), vec![42, 7]);
    assert_eq!(results[1].confidence, 0.5);

    let written = session.engine().unwrap().last_input().unwrap();
    assert_eq!(written, &TensorData::I8(vec![127; 8 * 8 * 3]));
}
