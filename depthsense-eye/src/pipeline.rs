//! Per-frame depth pipeline
//!
//! Each submitted frame gets a sequence number in capture order. Frames are
//! estimated and converted on worker tasks, so results can finish out of
//! order; a result is only applied if it is newer than the one already on
//! display; older ones are dropped as superseded. Applied results are
//! published on a watch channel for rendering and run through the
//! proximity policy, which may fire feedback.

use crate::config::EyeConfig;
use crate::error::EyeError;
use crate::estimator::DepthEstimator;
use crate::feedback::FeedbackSink;
use crate::frame::Frame;
use crate::proximity::{ProximityDecision, ProximityPolicy};
use chrono::{DateTime, Utc};
use depthsense_core::{ConversionResult, GridNormalizer};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of one frame, as handed to rendering and decision code
#[derive(Debug, Clone, Serialize)]
pub struct DepthFrameResult {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub conversion: ConversionResult,
    pub decision: ProximityDecision,
    /// Set when the conversion failed and an empty result stands in
    pub conversion_error: Option<String>,
}

/// Counters since the pipeline was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub submitted: u64,
    pub applied: u64,
    pub superseded: u64,
    pub degraded: u64,
    pub failed: u64,
    pub feedback_triggered: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    submitted: AtomicU64,
    applied: AtomicU64,
    superseded: AtomicU64,
    degraded: AtomicU64,
    failed: AtomicU64,
    feedback_triggered: AtomicU64,
}

impl StatsCounters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            feedback_triggered: self.feedback_triggered.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    config: Arc<EyeConfig>,
    estimator: Arc<dyn DepthEstimator>,
    feedback: Arc<dyn FeedbackSink>,
    normalizer: Arc<GridNormalizer>,
    policy: ProximityPolicy,
    next_sequence: AtomicU64,
    // Sequence of the result on display; guards apply ordering
    displayed: Mutex<u64>,
    display_tx: watch::Sender<Option<Arc<DepthFrameResult>>>,
    in_flight: Arc<Semaphore>,
    stats: StatsCounters,
}

/// One processing loop and its own stop signal
struct ProcessingLoop {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ProcessingLoop {
    fn is_active(&self) -> bool {
        !*self.stop_tx.borrow() && !self.handle.is_finished()
    }
}

/// Depth pipeline driving estimator, normalizer, and feedback
pub struct DepthPipeline {
    shared: Arc<Shared>,
    processing: Mutex<Option<ProcessingLoop>>,
}

impl DepthPipeline {
    /// Create a pipeline around an already-loaded estimator
    pub fn new(
        config: EyeConfig,
        estimator: Arc<dyn DepthEstimator>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Result<Self, EyeError> {
        config.validate().map_err(EyeError::Config)?;

        let normalizer = GridNormalizer::new(config.normalizer.clone())?;
        let output = estimator.output_shape();
        if output.plane_len() != Some(normalizer.config().denominator()) {
            warn!(
                "Estimator '{}' emits {}x{} planes but the average denominator is {}",
                estimator.name(),
                output.width,
                output.height,
                normalizer.config().denominator()
            );
        }

        let (display_tx, _) = watch::channel(None);
        let in_flight = Arc::new(Semaphore::new(config.max_in_flight));
        let policy = ProximityPolicy::new(config.trigger_threshold);

        info!(
            "Depth pipeline created with estimator '{}' and feedback '{}'",
            estimator.name(),
            feedback.name()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                estimator,
                feedback,
                normalizer: Arc::new(normalizer),
                policy,
                next_sequence: AtomicU64::new(0),
                displayed: Mutex::new(0),
                display_tx,
                in_flight,
                stats: StatsCounters::default(),
            }),
            processing: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &EyeConfig {
        &self.shared.config
    }

    /// Receive every applied result
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DepthFrameResult>>> {
        self.shared.display_tx.subscribe()
    }

    /// Result currently on display
    pub fn latest(&self) -> Option<Arc<DepthFrameResult>> {
        self.shared.display_tx.borrow().as_ref().cloned()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.stats.snapshot()
    }

    /// True while a loop started by `start` is consuming frames
    pub fn is_running(&self) -> bool {
        self.processing.lock().as_ref().map_or(false, ProcessingLoop::is_active)
    }

    /// Stamp a frame with the next sequence number
    pub fn submit(&self, frame: Frame) -> Frame {
        self.shared.submit(frame)
    }

    /// Run one frame to completion. Frames not yet submitted are submitted
    /// first. Returns the result if it was applied, `None` if a newer frame
    /// had already been applied.
    pub async fn process(&self, frame: Frame) -> Result<Option<Arc<DepthFrameResult>>, EyeError> {
        let frame = if frame.sequence() == 0 { self.submit(frame) } else { frame };
        let _permit = self
            .shared
            .in_flight
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EyeError::Pipeline(format!("In-flight limiter closed: {}", e)))?;
        self.shared.clone().run_frame(frame).await
    }

    /// Apply a finished result, dropping it if a newer one is on display
    pub fn apply(&self, result: DepthFrameResult) -> Option<Arc<DepthFrameResult>> {
        self.shared.apply(result)
    }

    /// Start consuming frames from a capture channel.
    ///
    /// Fails while a loop is active. A loop that was stopped but has not
    /// exited yet is aborted, so its receiver is dropped and never read again.
    pub fn start(&self, mut frames: mpsc::Receiver<Frame>) -> Result<(), EyeError> {
        let mut processing = self.processing.lock();
        if let Some(previous) = processing.take() {
            if previous.is_active() {
                *processing = Some(previous);
                return Err(EyeError::Pipeline("Depth pipeline already running".to_string()));
            }
            if !previous.handle.is_finished() {
                debug!("Aborting stopped depth pipeline loop before restart");
                previous.handle.abort();
            }
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    biased;
                    // Err means the pipeline was dropped
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    received = frames.recv() => match received {
                        Some(frame) => frame,
                        None => {
                            warn!("Frame sender closed, stopping depth pipeline");
                            break;
                        }
                    },
                };

                let frame = shared.submit(frame);
                let permit = match shared.in_flight.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!("In-flight limiter closed: {}", e);
                        break;
                    }
                };

                let worker = shared.clone();
                tokio::spawn(async move {
                    let _permit: OwnedSemaphorePermit = permit;
                    let sequence = frame.sequence();
                    if let Err(e) = worker.run_frame(frame).await {
                        error!("Frame {} processing error: {}", sequence, e);
                    }
                });
            }

            info!("Depth pipeline loop stopped");
        });

        *processing = Some(ProcessingLoop { stop_tx, handle });
        info!("Depth pipeline started");
        Ok(())
    }

    /// Ask the processing loop to stop after the current frame
    pub fn stop(&self) {
        if let Some(active) = self.processing.lock().as_ref() {
            active.stop_tx.send_replace(true);
        }
    }

    /// Stop the loop, wait for it, and release the estimator
    pub async fn shutdown(&self) -> Result<(), EyeError> {
        self.stop();

        let previous = self.processing.lock().take();
        if let Some(previous) = previous {
            if let Err(e) = previous.handle.await {
                warn!("Depth pipeline loop ended abnormally: {}", e);
            }
        }

        // Holding every permit means no frame is still in flight
        let permits = self.shared.config.max_in_flight as u32;
        let _drained = self
            .shared
            .in_flight
            .acquire_many(permits)
            .await
            .map_err(|e| EyeError::Pipeline(format!("In-flight limiter closed: {}", e)))?;

        self.shared.estimator.shutdown().await?;
        info!("Depth pipeline shut down");
        Ok(())
    }
}

impl Shared {
    fn submit(&self, mut frame: Frame) -> Frame {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        frame.set_sequence(sequence);
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        frame
    }

    async fn run_frame(self: Arc<Self>, frame: Frame) -> Result<Option<Arc<DepthFrameResult>>, EyeError> {
        let sequence = frame.sequence();
        let start = Instant::now();

        let tensor = match self.estimator.estimate(&frame).await {
            Ok(tensor) => tensor,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let normalizer = self.normalizer.clone();
        let (conversion, conversion_error) =
            match tokio::task::spawn_blocking(move || normalizer.convert_or_empty(&tensor)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    return Err(EyeError::Pipeline(format!("Conversion task failed: {}", e)));
                }
            };

        if conversion_error.is_some() {
            self.stats.degraded.fetch_add(1, Ordering::Relaxed);
        }

        let decision = self.policy.evaluate(conversion.average);
        debug!(
            "Frame {} converted in {:?}, average {:.4} ({:?})",
            sequence,
            start.elapsed(),
            conversion.average,
            decision
        );

        Ok(self.apply(DepthFrameResult {
            sequence,
            captured_at: frame.captured_at,
            conversion,
            decision,
            conversion_error: conversion_error.map(|e| e.to_string()),
        }))
    }

    fn apply(&self, result: DepthFrameResult) -> Option<Arc<DepthFrameResult>> {
        let result = Arc::new(result);
        {
            let mut displayed = self.displayed.lock();
            if result.sequence <= *displayed {
                self.stats.superseded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Dropping frame {}: frame {} already displayed",
                    result.sequence, *displayed
                );
                return None;
            }
            *displayed = result.sequence;
            self.display_tx.send_replace(Some(result.clone()));
        }
        self.stats.applied.fetch_add(1, Ordering::Relaxed);

        if result.decision == ProximityDecision::TooClose && self.config.feedback_enabled {
            match self.feedback.trigger(self.config.feedback_style) {
                Ok(()) => {
                    self.stats.feedback_triggered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => warn!("Feedback '{}' failed: {}", self.feedback.name(), e),
            }
        }

        Some(result)
    }
}

impl Drop for DepthPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
