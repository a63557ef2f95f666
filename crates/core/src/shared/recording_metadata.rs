/// Fixed parameters of one recording session.
///
/// Set once when the container is begun and never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordingMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl RecordingMetadata {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    /// Whole microseconds per frame as declared in the AVI main header.
    pub fn micros_per_frame(&self) -> u32 {
        if self.fps == 0 {
            0
        } else {
            1_000_000 / self.fps
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_construction() {
        let meta = RecordingMetadata::new(1920, 1080, 30);
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.fps, 30);
    }

    #[rstest]
    #[case::fps_10(10, 100_000)]
    #[case::fps_15(15, 66_666)]
    #[case::fps_30(30, 33_333)]
    #[case::zero_fps(0, 0)]
    fn test_micros_per_frame(#[case] fps: u32, #[case] expected: u32) {
        assert_eq!(RecordingMetadata::new(4, 4, fps).micros_per_frame(), expected);
    }
}
