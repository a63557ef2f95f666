use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::capture::domain::clock::Clock;
use crate::capture::domain::frame_source::FrameSource;
use crate::container::infrastructure::avi_mjpeg_writer::AviMjpegWriter;
use crate::encoding::domain::frame_encoder::FrameEncoder;
use crate::pipeline::capture_pacer::{CapturePacer, RecordError, RecordingReport};
use crate::pipeline::recording_config::RecordingConfig;
use crate::pipeline::recording_logger::RecordingLogger;
use crate::shared::constants::PARTIAL_FILE_SUFFIX;

/// Screen recording pipeline: capture → encode → AVI file.
///
/// Frames stream into `<output>.part`, which is renamed to `output` once
/// the container is finalized. A failed recording leaves no file behind.
pub struct RecordScreenUseCase {
    source: Box<dyn FrameSource>,
    encoder: Box<dyn FrameEncoder>,
    clock: Box<dyn Clock>,
    logger: Box<dyn RecordingLogger>,
    config: RecordingConfig,
    stop: Arc<AtomicBool>,
}

impl RecordScreenUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        encoder: Box<dyn FrameEncoder>,
        clock: Box<dyn Clock>,
        logger: Box<dyn RecordingLogger>,
        config: RecordingConfig,
    ) -> Self {
        Self {
            source,
            encoder,
            clock,
            logger,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses an externally owned stop flag, e.g. one a signal handler sets.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Flag that ends the recording after the in-flight frame when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn execute(self, output_path: &Path) -> Result<RecordingReport, RecordError> {
        let partial = partial_path(output_path);
        let writer = AviMjpegWriter::create(&partial)?;
        log::debug!("Writing to {}", partial.display());

        let mut pacer = CapturePacer::new(
            self.source,
            self.encoder,
            Box::new(writer),
            self.clock,
            self.logger,
            self.config,
        )
        .with_stop_flag(self.stop);
        let result = pacer.run();
        // closes the file before it is moved or removed
        drop(pacer);

        match result {
            Ok(report) => {
                std::fs::rename(&partial, output_path)?;
                log::info!("Saved {}", output_path.display());
                Ok(report)
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&partial) {
                    log::warn!("Could not remove {}: {rm}", partial.display());
                }
                Err(e)
            }
        }
    }
}

/// `out.avi` → `out.avi.part`
pub fn partial_path(output_path: &Path) -> PathBuf {
    let mut name: OsString = output_path.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_FILE_SUFFIX);
    PathBuf::from(name)
}
