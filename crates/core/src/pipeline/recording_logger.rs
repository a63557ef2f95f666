use std::collections::HashMap;
use std::time::Instant;

use crate::shared::constants::DEFAULT_PROGRESS_THROTTLE;

/// Cross-cutting logger for recording events.
///
/// Decouples the pacer from specific output mechanisms (log crate, GUI
/// signals) so each caller can observe a recording without changing the
/// capture loop.
pub trait RecordingLogger: Send {
    /// Report that `frames` frames have been written. `expected` is known
    /// only when the recording has a frame or duration limit.
    fn progress(&mut self, frames: usize, expected: Option<usize>);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. cadence lag).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emit an end-of-recording summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullRecordingLogger;

impl RecordingLogger for NullRecordingLogger {
    fn progress(&mut self, _frames: usize, _expected: Option<usize>) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Logger that aggregates per-stage timings and metrics and reports
/// through the `log` crate.
///
/// Progress lines are throttled to every `throttle_frames` frames.
pub struct LogRecordingLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames: usize,
}

impl LogRecordingLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = vec![format!(
            "Recording summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {max_ms:6.1}ms  total {total_ms:7.0}ms",
                mean(durations)
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let max = values.iter().copied().fold(0.0, f64::max);
            lines.push(format!("  {name}: avg {:.1}  max {max:.1}", mean(values)));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Effective rate: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for LogRecordingLogger {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_THROTTLE)
    }
}

impl RecordingLogger for LogRecordingLogger {
    fn progress(&mut self, frames: usize, expected: Option<usize>) {
        self.frames = frames;
        let last = expected.is_some_and(|total| frames == total);
        if frames % self.throttle_frames != 0 && !last {
            return;
        }
        match expected {
            Some(total) if total > 0 => {
                let pct = frames as f64 / total as f64 * 100.0;
                log::info!("Recording: {frames}/{total} frames ({pct:.1}%)");
            }
            _ => log::info!("Recording: {frames} frames"),
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullRecordingLogger;
        logger.progress(1, Some(10));
        logger.timing("encode", 5.0);
        logger.metric("lag_ms", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogRecordingLogger::new(10);
        logger.timing("encode", 20.0);
        logger.timing("encode", 30.0);
        logger.timing("write", 5.0);

        let encode = logger.timings_for("encode").unwrap();
        assert_eq!(encode.len(), 2);
        assert_relative_eq!(encode[1], 30.0);
        assert_eq!(logger.timings_for("write").unwrap().len(), 1);
        assert!(logger.timings_for("capture").is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = LogRecordingLogger::new(10);
        logger.metric("lag_ms", 3.0);
        logger.metric("lag_ms", 4.0);
        let values = logger.metrics_for("lag_ms").unwrap();
        assert_relative_eq!(mean(values), 3.5);
    }

    #[test]
    fn test_summary_includes_stages_and_metrics() {
        let mut logger = LogRecordingLogger::new(10);
        logger.progress(10, None);
        logger.timing("encode", 20.0);
        logger.timing("write", 2.0);
        logger.metric("lag_ms", 3.0);
        logger.metric("lag_ms", 4.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Recording summary (10 frames"));
        assert!(summary.contains("encode"));
        assert!(summary.contains("write"));
        assert!(summary.contains("lag_ms: avg 3.5  max 4.0"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = LogRecordingLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames() {
        let mut logger = LogRecordingLogger::new(10);
        for i in 1..=25 {
            logger.progress(i, None);
        }
        assert_eq!(logger.frames, 25);
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        assert_relative_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_default_throttle() {
        let logger = LogRecordingLogger::default();
        assert_eq!(logger.throttle_frames, DEFAULT_PROGRESS_THROTTLE);
    }
}
