use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub total_runs: u64,
    pub failed_runs: u64,
    pub latencies: VecDeque<u64>, // microseconds
    pub runs_by_algorithm: BTreeMap<String, u64>,
}

/// Collects per-run statistics for an engine. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MetricsCollector {
    state: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    runs: RunMetrics,
    max_history: usize,
}

impl MetricsCollector {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                runs: RunMetrics::default(),
                max_history,
            })),
        }
    }

    // A panic while holding the lock leaves counters that are still usable.
    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_run(&self, algorithm: &str, latency_us: u64, succeeded: bool) {
        let mut state = self.lock();
        let max_history = state.max_history;
        let runs = &mut state.runs;

        runs.total_runs += 1;
        if !succeeded {
            runs.failed_runs += 1;
        }
        *runs
            .runs_by_algorithm
            .entry(algorithm.to_string())
            .or_insert(0) += 1;

        runs.latencies.push_back(latency_us);
        if runs.latencies.len() > max_history {
            runs.latencies.pop_front();
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let r = &state.runs;

        let mut sorted_latencies: Vec<u64> = r.latencies.iter().copied().collect();
        sorted_latencies.sort_unstable();

        let p50 = percentile(&sorted_latencies, 50.0);
        let p95 = percentile(&sorted_latencies, 95.0);
        let p99 = percentile(&sorted_latencies, 99.0);

        let failure_rate = if r.total_runs > 0 {
            r.failed_runs as f32 / r.total_runs as f32
        } else {
            0.0
        };

        MetricsSnapshot {
            total_runs: r.total_runs,
            failed_runs: r.failed_runs,
            failure_rate,
            p50,
            p95,
            p99,
            history_count: r.latencies.len(),
            runs_by_algorithm: r.runs_by_algorithm.clone(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn percentile(sorted: &[u64], p: f32) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub total_runs: u64,
    pub failed_runs: u64,
    pub failure_rate: f32,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub history_count: usize,
    pub runs_by_algorithm: BTreeMap<String, u64>,
}
