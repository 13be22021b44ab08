//! Stage timing histograms for the term engine.
//! Each engine owns a registry; hosts read p50/p95/p99 from `summary()`.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timed engine stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    DictionaryLoad,
    IndexBuild,
    FindTerms,
    Rewrite,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::DictionaryLoad,
        Stage::IndexBuild,
        Stage::FindTerms,
        Stage::Rewrite,
    ];

    /// Metric name used in logs and summaries.
    pub fn metric_name(self) -> &'static str {
        match self {
            Stage::DictionaryLoad => "t_dictionary_load",
            Stage::IndexBuild => "t_index_build",
            Stage::FindTerms => "t_find_terms",
            Stage::Rewrite => "t_rewrite",
        }
    }
}

/// Running timer for one stage. Only `stop` records; a timer dropped on an
/// error path leaves no sample.
pub struct StageTimer {
    stage: Stage,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl StageTimer {
    pub fn stop(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.registry.record(self.stage, elapsed);
        elapsed
    }
}

/// Most recent samples of one stage, in microseconds.
#[derive(Debug)]
struct Samples {
    window: VecDeque<f64>,
    capacity: usize,
}

impl Samples {
    fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, micros: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(micros);
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted: Vec<f64> = self.window.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        sorted
    }
}

/// Nearest-rank percentile over sorted samples; 0 when empty.
fn percentile_of(sorted: &[f64], p: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return 0.0;
    };
    let rank = ((p.clamp(0.0, 100.0) / 100.0) * last as f64).round() as usize;
    sorted[rank.min(last)]
}

pub struct MetricsRegistry {
    stages: Mutex<HashMap<Stage, Samples>>,
    window: usize,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_window(256)
    }

    /// Keep the last `window` samples per stage.
    pub fn with_window(window: usize) -> Self {
        Self {
            stages: Mutex::new(HashMap::new()),
            window: window.max(1),
        }
    }

    pub fn record(&self, stage: Stage, elapsed: Duration) {
        let micros = elapsed.as_nanos() as f64 / 1000.0;
        self.stages
            .lock()
            .entry(stage)
            .or_insert_with(|| Samples::new(self.window))
            .push(micros);
        tracing::debug!(metric = stage.metric_name(), micros, "stage timed");
    }

    pub fn time(self: &Arc<Self>, stage: Stage) -> StageTimer {
        StageTimer {
            stage,
            start: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    /// Samples currently held for `stage`.
    pub fn count(&self, stage: Stage) -> usize {
        self.stages.lock().get(&stage).map_or(0, |s| s.window.len())
    }

    /// `p` in 0..=100, result in microseconds.
    pub fn percentile(&self, stage: Stage, p: f64) -> f64 {
        self.stages
            .lock()
            .get(&stage)
            .map_or(0.0, |s| percentile_of(&s.sorted(), p))
    }

    /// Per-stage summary keyed by metric name; stages never timed are omitted.
    pub fn summary(&self) -> BTreeMap<&'static str, StageSummary> {
        let stages = self.stages.lock();
        Stage::ALL
            .iter()
            .filter_map(|stage| {
                let samples = stages.get(stage)?;
                let sorted = samples.sorted();
                Some((
                    stage.metric_name(),
                    StageSummary {
                        p50_us: percentile_of(&sorted, 50.0),
                        p95_us: percentile_of(&sorted, 95.0),
                        p99_us: percentile_of(&sorted, 99.0),
                        max_us: sorted.last().copied().unwrap_or(0.0),
                        count: sorted.len(),
                    },
                ))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub max_us: f64,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn us(n: u64) -> Duration {
        Duration::from_micros(n)
    }

    #[test]
    fn percentiles_over_recorded_samples() {
        let registry = MetricsRegistry::new();
        for v in (1..=100).rev() {
            registry.record(Stage::FindTerms, us(v));
        }
        assert_eq!(registry.percentile(Stage::FindTerms, 0.0), 1.0);
        assert_eq!(registry.percentile(Stage::FindTerms, 100.0), 100.0);
        assert_eq!(registry.percentile(Stage::Rewrite, 50.0), 0.0);

        let summary = registry.summary();
        assert_eq!(summary["t_find_terms"].count, 100);
        assert_eq!(summary["t_find_terms"].max_us, 100.0);
        assert!(!summary.contains_key("t_rewrite"));
    }

    #[test]
    fn window_drops_oldest_samples() {
        let registry = MetricsRegistry::with_window(4);
        for v in [1, 2, 3, 4, 50, 60] {
            registry.record(Stage::Rewrite, us(v));
        }
        assert_eq!(registry.count(Stage::Rewrite), 4);
        assert_eq!(registry.percentile(Stage::Rewrite, 0.0), 3.0);
    }

    #[test]
    fn timer_records_only_when_stopped() {
        let registry = Arc::new(MetricsRegistry::new());
        drop(registry.time(Stage::DictionaryLoad));
        assert_eq!(registry.count(Stage::DictionaryLoad), 0);

        let timer = registry.time(Stage::IndexBuild);
        timer.stop();
        assert_eq!(registry.count(Stage::IndexBuild), 1);
    }
}
