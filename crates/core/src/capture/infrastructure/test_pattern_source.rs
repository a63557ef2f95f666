use std::time::Duration;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

const BAR_COLORS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Pixels the bars scroll left per frame.
const SCROLL_PER_FRAME: u32 = 4;

/// Deterministic scrolling colour bars.
///
/// Stands in for a display capture backend so recordings can be produced
/// and checked without access to a screen.
pub struct TestPatternSource {
    width: u32,
    height: u32,
    frame_limit: Option<usize>,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_limit: None,
        }
    }

    /// Report [`CaptureError::Exhausted`] after `limit` frames.
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// RGB of the pixel at column `x` in frame `index`.
    pub fn color_at(&self, x: u32, index: usize) -> [u8; 3] {
        let width = self.width.max(1) as u64;
        let scrolled = (x as u64 + index as u64 * SCROLL_PER_FRAME as u64) % width;
        let bar = (scrolled * BAR_COLORS.len() as u64 / width) as usize;
        BAR_COLORS[bar]
    }
}

impl FrameSource for TestPatternSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self, index: usize, timestamp: Duration) -> Result<Frame, CaptureError> {
        if self.frame_limit.is_some_and(|limit| index >= limit) {
            return Err(CaptureError::Exhausted);
        }

        let mut frame = Frame::blank(self.width, self.height, 3, index, timestamp);
        let row: Vec<[u8; 3]> = (0..self.width).map(|x| self.color_at(x, index)).collect();
        let mut pixels = frame
            .as_ndarray_mut()
            .ok_or_else(|| CaptureError::Failed("pattern buffer has wrong shape".into()))?;
        for (x, rgb) in row.iter().enumerate() {
            for (c, &value) in rgb.iter().enumerate() {
                pixels.slice_mut(ndarray::s![.., x, c]).fill(value);
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_have_requested_geometry() {
        let mut source = TestPatternSource::new(32, 16);
        let frame = source.capture(0, Duration::ZERO).unwrap();
        assert_eq!(source.dimensions(), (32, 16));
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 16);
        assert_eq!(frame.channels(), 3);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_columns_match_color_at() {
        let mut source = TestPatternSource::new(16, 4);
        let frame = source.capture(3, Duration::from_millis(300)).unwrap();
        let arr = frame.as_ndarray().unwrap();
        for x in 0..16u32 {
            let expected = source.color_at(x, 3);
            for y in 0..4 {
                let px = [
                    arr[[y, x as usize, 0]],
                    arr[[y, x as usize, 1]],
                    arr[[y, x as usize, 2]],
                ];
                assert_eq!(px, expected);
            }
        }
        assert_eq!(frame.index(), 3);
        assert_eq!(frame.timestamp(), Duration::from_millis(300));
    }

    #[test]
    fn test_pattern_scrolls_between_frames() {
        let mut source = TestPatternSource::new(64, 2);
        let a = source.capture(0, Duration::ZERO).unwrap();
        let b = source.capture(1, Duration::ZERO).unwrap();
        assert_ne!(a.data(), b.data());
        // same index reproduces the same frame
        let c = source.capture(0, Duration::ZERO).unwrap();
        assert_eq!(a.data(), c.data());
    }

    #[test]
    fn test_frame_limit_exhausts() {
        let mut source = TestPatternSource::new(8, 8).with_frame_limit(2);
        assert!(source.capture(0, Duration::ZERO).is_ok());
        assert!(source.capture(1, Duration::ZERO).is_ok());
        assert!(matches!(
            source.capture(2, Duration::ZERO),
            Err(CaptureError::Exhausted)
        ));
    }
}
