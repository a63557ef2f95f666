use std::time::Duration;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// The source has no more frames. Ends a recording cleanly.
    #[error("frame source exhausted")]
    Exhausted,
    #[error("capture failed: {0}")]
    Failed(String),
    #[error("failed to read frame source: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Produces raw frames on demand.
///
/// The pacer decides when to call `capture`; sources never block to
/// enforce timing themselves. Every frame of one source has the
/// dimensions reported by `dimensions`.
pub trait FrameSource: Send {
    /// `(width, height)` of every frame this source produces.
    fn dimensions(&self) -> (u32, u32);

    fn capture(&mut self, index: usize, timestamp: Duration) -> Result<Frame, CaptureError>;
}
