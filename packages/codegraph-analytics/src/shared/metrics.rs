//! Metrics port.
//!
//! Engines take an injected sink instead of writing to package-scoped
//! singletons; the default sink discards everything.

use std::sync::Arc;

/// Abstract metrics sink
pub trait MetricsSink: Send + Sync {
    /// Increment a named counter
    fn incr(&self, name: &'static str, delta: u64);

    /// Record a duration observation in milliseconds
    fn observe_ms(&self, name: &'static str, ms: f64);
}

/// Sink that drops all observations
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn incr(&self, _name: &'static str, _delta: u64) {}
    fn observe_ms(&self, _name: &'static str, _ms: f64) {}
}

/// Shared handle used throughout the engines
pub type MetricsHandle = Arc<dyn MetricsSink>;

/// Default no-op handle
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoopMetrics)
}

/// Sink that accumulates counters and duration sums in memory. Handy for
/// tests and for runtimes that scrape periodically.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: parking_lot::Mutex<std::collections::HashMap<&'static str, u64>>,
    durations_ms: parking_lot::Mutex<std::collections::HashMap<&'static str, (u64, f64)>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &'static str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// `(observation count, total milliseconds)` for a duration series
    pub fn duration(&self, name: &'static str) -> (u64, f64) {
        self.durations_ms
            .lock()
            .get(name)
            .copied()
            .unwrap_or((0, 0.0))
    }
}

impl MetricsSink for InMemoryMetrics {
    fn incr(&self, name: &'static str, delta: u64) {
        *self.counters.lock().entry(name).or_insert(0) += delta;
    }

    fn observe_ms(&self, name: &'static str, ms: f64) {
        let mut durations = self.durations_ms.lock();
        let entry = durations.entry(name).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += ms;
    }
}
