use std::collections::HashMap;
use std::time::Instant;

use crate::gating::domain::acceptance::GateStatus;
use crate::gating::domain::pipeline_outcome::GateEvaluation;

/// Cross-cutting logger for gating runs.
///
/// Use cases and the CLI report per-stage timings and terminal statuses here
/// instead of printing directly, so callers choose where the numbers go.
pub trait GateLogger: Send {
    /// Report frame-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record the terminal status of one frame.
    fn outcome(&mut self, status: GateStatus);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Record every stage timing and the status of one evaluation.
    fn evaluation(&mut self, evaluation: &GateEvaluation) {
        for (stage, ms) in evaluation.timings.stages() {
            self.timing(stage, ms);
        }
        self.outcome(evaluation.outcome.status());
    }

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullGateLogger;

impl GateLogger for NullGateLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn outcome(&mut self, _status: GateStatus) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that tracks per-stage timing and status counts and
/// reports them at the end of a batch.
///
/// Progress output is throttled to every `throttle_frames` frames.
pub struct StdoutGateLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    statuses: HashMap<GateStatus, usize>,
    start_time: Instant,
    total_frames: usize,
}

impl StdoutGateLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            statuses: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.statuses.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let evaluated: usize = self.statuses.values().sum();
        let mut lines = Vec::new();

        lines.push(format!(
            "Gate summary ({evaluated} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        for status in GateStatus::ALL {
            if let Some(&count) = self.statuses.get(&status) {
                let pct = count as f64 / evaluated.max(1) as f64 * 100.0;
                lines.push(format!("  {:14}: {count:5}  ({pct:4.1}%)", status.as_str()));
            }
        }
        if self.total_frames > evaluated {
            lines.push(format!(
                "  {:14}: {:5}",
                "NOT_EVALUATED",
                self.total_frames - evaluated
            ));
        }

        if evaluated > 0 && elapsed_ms > 0.0 {
            let fps = evaluated as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} frames/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn count_for(&self, status: GateStatus) -> usize {
        self.statuses.get(&status).copied().unwrap_or(0)
    }
}

impl Default for StdoutGateLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl GateLogger for StdoutGateLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_frames = total;
        if total > 0 && (current % self.throttle_frames == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn outcome(&mut self, status: GateStatus) {
        *self.statuses.entry(status).or_default() += 1;
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
