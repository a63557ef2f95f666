use thiserror::Error;

use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("frame is empty ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error(
        "frame buffer holds {actual} bytes but {width}x{height}x{channels} requires {expected}"
    )]
    DimensionMismatch {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),
    #[error("compressor rejected frame: {0}")]
    Compression(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Compresses one raw frame into a self-contained payload.
///
/// Every output is independently decodable; no state is shared between
/// frames beyond configuration, so implementations may be swapped per
/// session.
pub trait FrameEncoder: Send {
    fn encode(&mut self, frame: &Frame) -> Result<EncodedFrame, EncodeError>;
}
