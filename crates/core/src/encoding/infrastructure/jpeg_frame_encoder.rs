use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::encoding::domain::frame_encoder::{EncodeError, FrameEncoder};
use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::encoded_frame::EncodedFrame;
use crate::shared::frame::Frame;

/// Baseline JPEG encoder backed by the `image` crate.
///
/// Gray and RGB frames are compressed directly. RGBA frames lose their
/// alpha channel since JPEG cannot carry one.
pub struct JpegFrameEncoder {
    quality: u8,
}

impl JpegFrameEncoder {
    /// `quality` is clamped to 1-100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&mut self, frame: &Frame) -> Result<EncodedFrame, EncodeError> {
        validate(frame)?;

        let (pixels, color): (Cow<'_, [u8]>, ExtendedColorType) = match frame.channels() {
            1 => (Cow::Borrowed(frame.data()), ExtendedColorType::L8),
            3 => (Cow::Borrowed(frame.data()), ExtendedColorType::Rgb8),
            4 => (Cow::Owned(strip_alpha(frame.data())), ExtendedColorType::Rgb8),
            other => return Err(EncodeError::UnsupportedChannels(other)),
        };

        let mut buffer = Vec::with_capacity(frame.expected_len() / 8);
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
        encoder
            .encode(&pixels, frame.width(), frame.height(), color)
            .map_err(|e| EncodeError::Compression(Box::new(e)))?;

        Ok(EncodedFrame::new(buffer, frame.width(), frame.height()))
    }
}

fn validate(frame: &Frame) -> Result<(), EncodeError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(EncodeError::EmptyFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }
    if !matches!(frame.channels(), 1 | 3 | 4) {
        return Err(EncodeError::UnsupportedChannels(frame.channels()));
    }
    if !frame.is_well_formed() {
        return Err(EncodeError::DimensionMismatch {
            width: frame.width(),
            height: frame.height(),
            channels: frame.channels(),
            expected: frame.expected_len(),
            actual: frame.data().len(),
        });
    }
    Ok(())
}

fn strip_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}
