//! Minimal run‑time metrics sink.
//!
//! Prometheus export is left out; instead the host process may register a
//! plain callback that receives name/value pairs.

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Signature for external collectors.
pub type StatsCallback = fn(name: &str, value: f64);

static CALLBACK: OnceCell<StatsCallback> = OnceCell::new();

/// Register the collector. Only the first registration takes effect.
pub fn register_stats_callback(cb: StatsCallback) -> bool {
    init();
    CALLBACK.set(cb).is_ok()
}

#[inline]
fn forward(key: &Key, value: f64) {
    if let Some(cb) = CALLBACK.get() {
        cb(key.name(), value);
    }
}

/// Forwarding recorder. Uses the callback **if** it was registered.
struct CallbackRecorder;

struct Forward {
    key: Key,
}

impl Recorder for CallbackRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(Forward { key: key.clone() }))
    }
    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(Forward { key: key.clone() }))
    }
    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(Forward { key: key.clone() }))
    }
}

impl metrics::CounterFn for Forward {
    fn increment(&self, value: u64) {
        forward(&self.key, value as f64);
    }
    fn absolute(&self, value: u64) {
        forward(&self.key, value as f64);
    }
}

impl metrics::GaugeFn for Forward {
    fn set(&self, value: f64) {
        forward(&self.key, value);
    }
    fn increment(&self, value: f64) {
        forward(&self.key, value);
    }
    fn decrement(&self, value: f64) {
        forward(&self.key, -value);
    }
}

impl metrics::HistogramFn for Forward {
    fn record(&self, value: f64) {
        forward(&self.key, value);
    }
}

/// Install exactly **once**. A recorder the host installed first is kept.
pub fn init() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = metrics::set_global_recorder(CallbackRecorder);
    });
}
