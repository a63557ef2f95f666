use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::capture::domain::clock::Clock;
use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::container::domain::container_writer::{ContainerSummary, ContainerWriter, MuxError};
use crate::encoding::domain::frame_encoder::{EncodeError, FrameEncoder};
use crate::pipeline::recording_config::{EncodeFailurePolicy, RecordingConfig};
use crate::pipeline::recording_logger::RecordingLogger;
use crate::shared::recording_metadata::RecordingMetadata;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("invalid recording configuration: {0}")]
    InvalidConfig(String),
    #[error("recording cannot start from state {0:?}")]
    InvalidState(RecordingState),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("failed to encode frame {frame}: {source}")]
    Encode {
        frame: usize,
        #[source]
        source: EncodeError,
    },
    #[error(transparent)]
    Mux(#[from] MuxError),
    #[error("output file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session lifecycle. `Closed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Finalizing,
    Closed,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordingOutcome {
    Complete,
    /// Finalized early after an encode failure; playable but incomplete.
    Truncated { reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordingReport {
    pub frames_written: u32,
    pub elapsed: Duration,
    /// Worst delay between a frame's ideal time and when its capture began.
    pub max_lag: Duration,
    pub container: ContainerSummary,
    pub outcome: RecordingOutcome,
}

impl RecordingReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == RecordingOutcome::Complete
    }
}

/// Drives capture → encode → write at a fixed frame rate on the calling
/// thread.
///
/// Frame `k` is due at `start + k / fps`. The pacer sleeps until then if
/// it is early and proceeds at once if it is late: slow stages cause the
/// cadence to drift, never dropped or duplicated frames, so the declared
/// frame count always matches what was written.
///
/// The stop flag is checked once per iteration, before waiting for the
/// next frame. A frame that has been captured is always written before
/// the flag is honoured, and the container is finalized exactly once.
pub struct CapturePacer {
    source: Box<dyn FrameSource>,
    encoder: Box<dyn FrameEncoder>,
    writer: Box<dyn ContainerWriter>,
    clock: Box<dyn Clock>,
    logger: Box<dyn RecordingLogger>,
    config: RecordingConfig,
    stop: Arc<AtomicBool>,
    state: RecordingState,
}

impl CapturePacer {
    pub fn new(
        source: Box<dyn FrameSource>,
        encoder: Box<dyn FrameEncoder>,
        writer: Box<dyn ContainerWriter>,
        clock: Box<dyn Clock>,
        logger: Box<dyn RecordingLogger>,
        config: RecordingConfig,
    ) -> Self {
        Self {
            source,
            encoder,
            writer,
            clock,
            logger,
            config,
            stop: Arc::new(AtomicBool::new(false)),
            state: RecordingState::Idle,
        }
    }

    /// Shares an externally owned stop flag instead of the pacer's own.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Setting the returned flag ends the recording after the current frame.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn run(&mut self) -> Result<RecordingReport, RecordError> {
        if self.state != RecordingState::Idle {
            return Err(RecordError::InvalidState(self.state));
        }
        self.config.validate().map_err(RecordError::InvalidConfig)?;

        let (width, height) = self.source.dimensions();
        let metadata = RecordingMetadata::new(width, height, self.config.fps);
        if let Err(e) = self.writer.begin(&metadata) {
            return self.abort(e.into());
        }
        self.state = RecordingState::Recording;
        self.logger.info(&format!(
            "Recording {width}x{height} at {} fps",
            self.config.fps
        ));

        let expected = self.config.expected_frames();
        let start = self.clock.now();
        let mut max_lag = Duration::ZERO;
        let mut truncated: Option<String> = None;
        let mut index = 0usize;

        loop {
            if self.stop.load(Ordering::Relaxed) {
                self.logger.info("Stop requested");
                break;
            }
            if self.config.max_frames.is_some_and(|max| index >= max) {
                break;
            }
            let due = self.config.frame_time(index);
            if self.config.max_duration.is_some_and(|max| due >= max) {
                break;
            }

            self.clock.sleep_until(start + due);
            let began = self.clock.now().saturating_sub(start);
            let lag = began.saturating_sub(due);
            max_lag = max_lag.max(lag);
            self.logger.metric("lag_ms", lag.as_secs_f64() * 1000.0);

            let frame = match self.source.capture(index, began) {
                Ok(frame) => frame,
                Err(CaptureError::Exhausted) => {
                    self.logger.info("Frame source exhausted");
                    break;
                }
                Err(e) => return self.abort(e.into()),
            };
            let captured = self.clock.now();
            self.logger
                .timing("capture", ms_between(start + began, captured));

            let encoded = match self.encoder.encode(&frame) {
                Ok(encoded) => encoded,
                Err(source) => match self.config.encode_failure {
                    EncodeFailurePolicy::Abort => {
                        return self.abort(RecordError::Encode {
                            frame: index,
                            source,
                        })
                    }
                    EncodeFailurePolicy::FinalizeTruncated => {
                        let reason = format!("frame {index} failed to encode: {source}");
                        log::warn!("{reason}; finalizing {index} frames");
                        truncated = Some(reason);
                        break;
                    }
                },
            };
            drop(frame);
            let encoded_at = self.clock.now();
            self.logger.timing("encode", ms_between(captured, encoded_at));

            if let Err(e) = self.writer.write_frame(&encoded) {
                return self.abort(e.into());
            }
            self.logger
                .timing("write", ms_between(encoded_at, self.clock.now()));

            index += 1;
            self.logger.progress(index, expected);
        }

        self.state = RecordingState::Finalizing;
        let container = match self.writer.finalize() {
            Ok(summary) => summary,
            Err(e) => return self.abort(e.into()),
        };
        self.state = RecordingState::Closed;
        self.logger.summary();

        let elapsed = self.clock.now().saturating_sub(start);
        log::info!(
            "Recorded {} frames in {:.1}s ({} bytes)",
            container.frame_count,
            elapsed.as_secs_f64(),
            container.file_len
        );

        Ok(RecordingReport {
            frames_written: container.frame_count,
            elapsed,
            max_lag,
            container,
            outcome: match truncated {
                Some(reason) => RecordingOutcome::Truncated { reason },
                None => RecordingOutcome::Complete,
            },
        })
    }

    fn abort<T>(&mut self, err: RecordError) -> Result<T, RecordError> {
        log::error!("Recording failed: {err}");
        self.state = RecordingState::Failed;
        Err(err)
    }
}

fn ms_between(from: Duration, to: Duration) -> f64 {
    to.saturating_sub(from).as_secs_f64() * 1000.0
}
