//! Pipeline tests for depthsense-eye

use async_trait::async_trait;
use depthsense_core::{NormalizerConfig, Tensor, TensorShape};
use depthsense_eye::{
    DepthEstimator, DepthPipeline, EyeConfig, EyeError, FeedbackSink, FeedbackStyle, Frame,
    LoggingFeedback, LuminanceEstimator, ProximityDecision,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sleeps for the frame's first pixel in milliseconds, then returns a fixed tensor
struct DelayedEstimator {
    tensor: Tensor,
    shut_down: AtomicBool,
}

impl DelayedEstimator {
    fn new(tensor: Tensor) -> Self {
        Self {
            tensor,
            shut_down: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl DepthEstimator for DelayedEstimator {
    async fn estimate(&self, frame: &Frame) -> Result<Tensor, EyeError> {
        let delay = frame.pixel(0, 0).unwrap_or(0) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(self.tensor.clone())
    }

    fn output_shape(&self) -> TensorShape {
        TensorShape::new(1, 2, 2)
    }

    fn name(&self) -> &str {
        "delayed"
    }

    async fn shutdown(&self) -> Result<(), EyeError> {
        self.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingEstimator;

#[async_trait]
impl DepthEstimator for FailingEstimator {
    async fn estimate(&self, _frame: &Frame) -> Result<Tensor, EyeError> {
        Err(EyeError::Estimator("inference failed".to_string()))
    }

    fn output_shape(&self) -> TensorShape {
        TensorShape::new(1, 2, 2)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[derive(Default)]
struct RecordingFeedback {
    events: Mutex<Vec<FeedbackStyle>>,
}

impl FeedbackSink for RecordingFeedback {
    fn trigger(&self, style: FeedbackStyle) -> Result<(), EyeError> {
        self.events.lock().push(style);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn small_config() -> EyeConfig {
    EyeConfig {
        normalizer: NormalizerConfig::for_resolution(2, 2),
        ..EyeConfig::default()
    }
}

fn frame_with_delay(delay_ms: u8) -> Frame {
    Frame::grayscale(1, 1, vec![delay_ms]).unwrap()
}

fn close_tensor() -> Tensor {
    Tensor::single_plane(2, 2, vec![0.2, 0.8, 0.4, 0.6]).unwrap()
}

#[tokio::test]
async fn test_newer_result_supersedes_slow_older_frame() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    let slow = pipeline.submit(frame_with_delay(80));
    let fast = pipeline.submit(frame_with_delay(0));

    let (slow_result, fast_result) = tokio::join!(pipeline.process(slow), pipeline.process(fast));

    assert_eq!(fast_result.unwrap().unwrap().sequence, 2);
    assert!(slow_result.unwrap().is_none());
    assert_eq!(pipeline.latest().unwrap().sequence, 2);

    let stats = pipeline.stats();
    assert_eq!(stats.submitted, 2);
    assert_eq!(stats.applied, 1);
    assert_eq!(stats.superseded, 1);
}

#[tokio::test]
async fn test_results_in_capture_order_are_all_applied() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    for expected in 1..=3u64 {
        let result = pipeline.process(frame_with_delay(0)).await.unwrap().unwrap();
        assert_eq!(result.sequence, expected);
    }
    assert_eq!(pipeline.stats().applied, 3);
    assert_eq!(pipeline.stats().superseded, 0);
}

#[tokio::test]
async fn test_end_to_end_average_and_feedback() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let feedback = Arc::new(RecordingFeedback::default());
    let pipeline = DepthPipeline::new(small_config(), estimator, feedback.clone()).unwrap();

    let result = pipeline.process(frame_with_delay(0)).await.unwrap().unwrap();
    assert!((result.conversion.average - 0.5).abs() < 1e-9);
    assert_eq!(result.decision, ProximityDecision::TooClose);
    assert_eq!(*feedback.events.lock(), vec![FeedbackStyle::Heavy]);
    assert_eq!(pipeline.stats().feedback_triggered, 1);
}

#[tokio::test]
async fn test_feedback_disabled() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let feedback = Arc::new(RecordingFeedback::default());
    let mut config = small_config();
    config.feedback_enabled = false;
    let pipeline = DepthPipeline::new(config, estimator, feedback.clone()).unwrap();

    let result = pipeline.process(frame_with_delay(0)).await.unwrap().unwrap();
    assert_eq!(result.decision, ProximityDecision::TooClose);
    assert!(feedback.events.lock().is_empty());
}

#[tokio::test]
async fn test_configured_denominator_controls_average() {
    // Same 2x2 tensor, default 128x160 denominator
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let feedback = Arc::new(RecordingFeedback::default());
    let pipeline = DepthPipeline::new(EyeConfig::default(), estimator, feedback.clone()).unwrap();

    let result = pipeline.process(frame_with_delay(0)).await.unwrap().unwrap();
    assert!((result.conversion.average - 2.0 / 20480.0).abs() < 1e-12);
    assert_eq!(result.decision, ProximityDecision::Clear);
    assert!(feedback.events.lock().is_empty());
}

#[tokio::test]
async fn test_invalid_tensor_degrades_to_empty_result() {
    let bad = Tensor::new(vec![2, 2], vec![0.1, 0.2, 0.3, 0.4]);
    let estimator = Arc::new(DelayedEstimator::new(bad));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    let result = pipeline.process(frame_with_delay(0)).await.unwrap().unwrap();
    assert!(result.conversion.is_empty());
    assert_eq!(result.decision, ProximityDecision::Clear);
    assert!(result.conversion_error.as_ref().unwrap().contains("Invalid tensor shape"));
    assert_eq!(pipeline.stats().degraded, 1);
}

#[tokio::test]
async fn test_estimator_failure_is_reported() {
    let pipeline = DepthPipeline::new(
        small_config(),
        Arc::new(FailingEstimator),
        Arc::new(LoggingFeedback::new()),
    )
    .unwrap();

    let result = pipeline.process(frame_with_delay(0)).await;
    assert!(matches!(result, Err(EyeError::Estimator(_))));
    assert_eq!(pipeline.stats().failed, 1);
    assert!(pipeline.latest().is_none());
}

#[tokio::test]
async fn test_start_consumes_channel_and_shutdown_releases_estimator() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator.clone(), Arc::new(LoggingFeedback::new())).unwrap();
    let mut display = pipeline.subscribe();

    let (tx, rx) = mpsc::channel(4);
    pipeline.start(rx).unwrap();
    assert!(pipeline.is_running());

    tx.send(frame_with_delay(0)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), display.changed())
        .await
        .expect("result published")
        .unwrap();
    assert_eq!(display.borrow().as_ref().unwrap().sequence, 1);

    pipeline.shutdown().await.unwrap();
    assert!(!pipeline.is_running());
    assert!(estimator.shut_down.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_start_twice_fails() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    let (_tx1, rx1) = mpsc::channel(1);
    let (_tx2, rx2) = mpsc::channel(1);
    pipeline.start(rx1).unwrap();
    assert!(matches!(pipeline.start(rx2), Err(EyeError::Pipeline(_))));
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_loop_stops_when_sender_dropped() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    let (tx, rx) = mpsc::channel(1);
    pipeline.start(rx).unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(2), async {
        while pipeline.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("loop stopped");
}

#[tokio::test]
async fn test_restart_abandons_old_channel() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    let (tx1, rx1) = mpsc::channel(4);
    pipeline.start(rx1).unwrap();
    pipeline.stop();
    assert!(!pipeline.is_running());

    let (tx2, rx2) = mpsc::channel(4);
    pipeline.start(rx2).unwrap();
    assert!(pipeline.is_running());
    tokio::time::sleep(Duration::from_millis(250)).await;

    // The stopped loop no longer reads its receiver
    let _ = tx1.send(frame_with_delay(0)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(pipeline.stats().submitted, 0);

    // Closing the old channel leaves the new loop alone
    drop(tx1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(pipeline.is_running());

    let mut display = pipeline.subscribe();
    tx2.send(frame_with_delay(0)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), display.changed())
        .await
        .expect("result published")
        .unwrap();
    assert_eq!(pipeline.stats().applied, 1);

    pipeline.shutdown().await.unwrap();
    assert!(!pipeline.is_running());
}

#[tokio::test]
async fn test_luminance_estimator_through_pipeline() {
    let estimator = Arc::new(LuminanceEstimator::new(4, 4).unwrap());
    let config = EyeConfig {
        normalizer: NormalizerConfig::for_resolution(4, 4),
        ..EyeConfig::default()
    };
    let pipeline = DepthPipeline::new(config, estimator, Arc::new(LoggingFeedback::new())).unwrap();

    // Left half dim, right half bright
    let mut pixels = Vec::new();
    for _ in 0..4 {
        pixels.extend_from_slice(&[20u8, 20, 200, 200]);
    }
    let frame = Frame::grayscale(4, 4, pixels).unwrap();
    let result = pipeline.process(frame).await.unwrap().unwrap();

    let grid = &result.conversion.normalized;
    assert_eq!(grid.dims(), (4, 4));
    for row in 0..4 {
        assert_eq!(grid.row(row), &[0.0, 0.0, 1.0, 1.0]);
    }
    assert!((result.conversion.average - 0.5).abs() < 1e-9);
    assert_eq!(result.decision, ProximityDecision::TooClose);
}

#[tokio::test]
async fn test_result_serializes() {
    let estimator = Arc::new(DelayedEstimator::new(close_tensor()));
    let pipeline = DepthPipeline::new(small_config(), estimator, Arc::new(LoggingFeedback::new())).unwrap();

    let result = pipeline.process(frame_with_delay(0)).await.unwrap().unwrap();
    let json = serde_json::to_value(result.as_ref()).unwrap();
    assert_eq!(json["sequence"], 1);
    assert_eq!(json["decision"], "TooClose");
    assert_eq!(json["conversion"]["occupancy"]["rows"], 2);
}
