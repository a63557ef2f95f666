use std::time::Duration;

use crate::shared::constants::DEFAULT_FPS;

/// What the pacer does when a frame fails to encode mid-recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EncodeFailurePolicy {
    /// Fail the whole session; the partial output is discarded.
    #[default]
    Abort,
    /// Finalize the frames written so far into a valid but truncated file,
    /// reported as [`RecordingOutcome::Truncated`](super::capture_pacer::RecordingOutcome).
    FinalizeTruncated,
}

/// Parameters of one recording run.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordingConfig {
    pub fps: u32,
    pub max_frames: Option<usize>,
    pub max_duration: Option<Duration>,
    pub encode_failure: EncodeFailurePolicy,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            max_frames: None,
            max_duration: None,
            encode_failure: EncodeFailurePolicy::Abort,
        }
    }
}

impl RecordingConfig {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_max_frames(mut self, frames: usize) -> Self {
        self.max_frames = Some(frames);
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn with_encode_failure(mut self, policy: EncodeFailurePolicy) -> Self {
        self.encode_failure = policy;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.fps == 0 {
            return Err("fps must be at least 1".into());
        }
        if self.max_duration.is_some_and(|d| d.is_zero()) {
            return Err("max duration must be positive".into());
        }
        Ok(())
    }

    /// Ideal emission time of frame `index` relative to the session start.
    ///
    /// Computed from the index directly so rounding never accumulates.
    pub fn frame_time(&self, index: usize) -> Duration {
        let fps = self.fps.max(1) as u128;
        Duration::from_nanos((index as u128 * 1_000_000_000 / fps) as u64)
    }

    /// Number of frames the limits allow, if any limit is set.
    pub fn expected_frames(&self) -> Option<usize> {
        let by_duration = self.max_duration.map(|d| {
            let fps = self.fps.max(1) as u128;
            // frames whose ideal time lies strictly before the limit
            (d.as_nanos() * fps).div_ceil(1_000_000_000) as usize
        });
        match (self.max_frames, by_duration) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = RecordingConfig::default();
        assert_eq!(config.fps, DEFAULT_FPS);
        assert_eq!(config.max_frames, None);
        assert_eq!(config.max_duration, None);
        assert_eq!(config.encode_failure, EncodeFailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = RecordingConfig::default()
            .with_fps(30)
            .with_max_frames(90)
            .with_max_duration(Duration::from_secs(5))
            .with_encode_failure(EncodeFailurePolicy::FinalizeTruncated);
        assert_eq!(config.fps, 30);
        assert_eq!(config.max_frames, Some(90));
        assert_eq!(config.max_duration, Some(Duration::from_secs(5)));
        assert_eq!(config.encode_failure, EncodeFailurePolicy::FinalizeTruncated);
    }

    #[test]
    fn test_zero_fps_is_invalid() {
        assert!(RecordingConfig::default().with_fps(0).validate().is_err());
    }

    #[test]
    fn test_zero_duration_is_invalid() {
        let config = RecordingConfig::default().with_max_duration(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case::first(10, 0, Duration::ZERO)]
    #[case::tenth(10, 1, Duration::from_millis(100))]
    #[case::thirds(3, 1, Duration::from_nanos(333_333_333))]
    #[case::thirds_no_drift(3, 3000, Duration::from_secs(1000))]
    fn test_frame_time(#[case] fps: u32, #[case] index: usize, #[case] expected: Duration) {
        let config = RecordingConfig::default().with_fps(fps);
        assert_eq!(config.frame_time(index), expected);
    }

    #[rstest]
    #[case::unbounded(None, None, None)]
    #[case::frames_only(Some(7), None, Some(7))]
    #[case::duration_only(None, Some(Duration::from_secs(2)), Some(20))]
    #[case::partial_interval(None, Some(Duration::from_millis(250)), Some(3))]
    #[case::tighter_frames(Some(5), Some(Duration::from_secs(2)), Some(5))]
    fn test_expected_frames(
        #[case] max_frames: Option<usize>,
        #[case] max_duration: Option<Duration>,
        #[case] expected: Option<usize>,
    ) {
        let config = RecordingConfig {
            fps: 10,
            max_frames,
            max_duration,
            encode_failure: EncodeFailurePolicy::Abort,
        };
        assert_eq!(config.expected_frames(), expected);
    }
}
