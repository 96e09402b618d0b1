use std::collections::HashMap;
use std::time::Instant;

/// Stage names reported through [`PipelineLogger::timing`].
pub mod stage {
    pub const PROBE: &str = "probe";
    pub const EXTRACT: &str = "extract";
    pub const COMPILE: &str = "compile";
    pub const RENDER: &str = "render";
    pub const ENCODE: &str = "encode";
    pub const ASSEMBLE: &str = "assemble";
}

/// Observer for merge job events.
///
/// Keeps the job free of any particular output mechanism; the CLI logs
/// through `log`, tests discard everything.
pub trait PipelineLogger: Send {
    /// Transition frames rendered so far out of `total`.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long one unit of a stage took. Render reports once per
    /// frame, every other stage once per job.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. frames per segment).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-job summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger that tracks per-stage timing and metrics and reports a
/// summary when the job ends.
///
/// Render progress is printed every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    rendered_frames: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            rendered_frames: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Merge summary ({} transition frames, {:.1}s total):",
            self.rendered_frames,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for name in stages {
            let total_ms: f64 = self.timings[name].iter().sum();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!("  {name:10}: {total_ms:8.0}ms  ({pct:4.1}%)"));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let last = values.last().copied().unwrap_or_default();
            lines.push(format!("  {name}: {last}"));
        }

        let render_ms: f64 = self
            .timings
            .get(stage::RENDER)
            .map(|v| v.iter().sum())
            .unwrap_or_default();
        if self.rendered_frames > 0 && render_ms > 0.0 {
            let fps = self.rendered_frames as f64 / (render_ms / 1000.0);
            lines.push(format!("  Render throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    /// Returns the timing data for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Returns the metric data for a given name.
    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.rendered_frames = current;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Rendering: {current}/{total} transition frames ({pct:.1}%)");
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
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing(stage::RENDER, 5.0);
        logger.metric("pre_frames", 60.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_accumulates_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(stage::RENDER, 20.0);
        logger.timing(stage::RENDER, 30.0);
        logger.timing(stage::PROBE, 5.0);

        assert_eq!(logger.timings_for(stage::RENDER).unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for(stage::PROBE).unwrap(), &[5.0]);
        assert!(logger.timings_for(stage::ENCODE).is_none());
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(stage::EXTRACT, 120.0);
        logger.timing(stage::ASSEMBLE, 15.0);
        logger.metric("post_frames", 60.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Merge summary"));
        assert!(summary.contains("extract"));
        assert!(summary.contains("assemble"));
        assert!(summary.contains("post_frames: 60"));
    }

    #[test]
    fn test_summary_reports_render_throughput() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=10 {
            logger.timing(stage::RENDER, 100.0);
            logger.progress(i, 10);
        }
        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Render throughput: 10.0 fps"));
    }

    #[test]
    fn test_no_throughput_without_render() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing(stage::PROBE, 10.0);
        assert!(!logger.summary_string().unwrap().contains("throughput"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_rendered_frames() {
        let mut logger = StdoutPipelineLogger::new(4);
        for i in 1..=7 {
            logger.progress(i, 30);
        }
        assert_eq!(logger.rendered_frames, 7);
    }

    #[test]
    fn test_metric_keeps_history() {
        let mut logger = StdoutPipelineLogger::default();
        logger.metric("transition_frames", 30.0);
        logger.metric("transition_frames", 45.0);
        let values = logger.metrics_for("transition_frames").unwrap();
        assert_relative_eq!(values[1], 45.0);
        assert_eq!(logger.throttle_frames, 10);
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.info("probing inputs");
        assert_eq!(logger.messages, vec!["probing inputs".to_string()]);
    }
}
