use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Analyzer stages, in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AreaProfile,
    Parameters,
    Curvature,
    Transitions,
    Fitting,
    Merging,
    Refinement,
}

/// Wall time of one analyzer stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: f64,
}

/// Per-stage timings of one analysis run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn stage_ms(&self, stage: Stage) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.elapsed_ms)
    }

    /// Sum of the recorded stages, at most `total_ms`.
    pub fn staged_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

/// Stopwatch that charges elapsed time to consecutive stages.
#[derive(Debug)]
pub struct StageClock {
    started: Instant,
    lap_start: Instant,
    timings: TimingBreakdown,
}

impl StageClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            lap_start: now,
            timings: TimingBreakdown::default(),
        }
    }

    /// Charges the time since the previous lap to `stage`.
    pub fn lap(&mut self, stage: Stage) {
        let now = Instant::now();
        self.timings.stages.push(StageTiming {
            stage,
            elapsed_ms: millis(now - self.lap_start),
        });
        self.lap_start = now;
    }

    pub fn elapsed_ms(&self) -> f64 {
        millis(self.started.elapsed())
    }

    pub fn finish(mut self) -> TimingBreakdown {
        self.timings.total_ms = self.elapsed_ms();
        self.timings
    }
}

#[inline]
fn millis(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
