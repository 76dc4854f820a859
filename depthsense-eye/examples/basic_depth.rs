//! Basic example of using depthsense-eye
//!
//! Feeds synthetic frames with a bright patch that grows towards the camera
//! through the pipeline and prints each applied average.

use depthsense_eye::{DepthPipeline, EyeConfig, Frame, LoggingFeedback, LuminanceEstimator};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 48;

fn synthetic_frame(step: u32) -> anyhow::Result<Frame> {
    let radius = (step * 3) as i64;
    let (cx, cy) = (FRAME_WIDTH as i64 / 2, FRAME_HEIGHT as i64 / 2);
    let mut pixels = Vec::with_capacity((FRAME_WIDTH * FRAME_HEIGHT) as usize);
    for y in 0..FRAME_HEIGHT as i64 {
        for x in 0..FRAME_WIDTH as i64 {
            let inside = (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius;
            pixels.push(if inside { 230u8 } else { 40u8 });
        }
    }
    Ok(Frame::grayscale(FRAME_WIDTH, FRAME_HEIGHT, pixels)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EyeConfig::from_file(path)?,
        None => EyeConfig::default(),
    };

    // Loaded once, shared by every frame
    let estimator = Arc::new(LuminanceEstimator::new(
        config.normalizer.output_width,
        config.normalizer.output_height,
    )?);
    let feedback = Arc::new(LoggingFeedback::new());
    let pipeline = DepthPipeline::new(config, estimator, feedback.clone())?;

    let mut display = pipeline.subscribe();
    let (tx, rx) = mpsc::channel(8);
    pipeline.start(rx)?;

    let producer = tokio::spawn(async move {
        for step in 0..12 {
            let frame = match synthetic_frame(step) {
                Ok(frame) => frame,
                Err(e) => {
                    eprintln!("Failed to build frame: {}", e);
                    break;
                }
            };
            if tx.send(frame).await.is_err() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    });

    let printer = tokio::spawn(async move {
        while display.changed().await.is_ok() {
            let result = display.borrow_and_update().as_ref().cloned();
            if let Some(result) = result {
                println!(
                    "frame {:>3}  average {:.4}  {:?}",
                    result.sequence, result.conversion.average, result.decision
                );
            }
        }
    });

    producer.await?;
    pipeline.shutdown().await?;
    printer.abort();

    println!("stats: {:?}", pipeline.stats());
    println!("feedback events: {}", feedback.count());
    Ok(())
}
