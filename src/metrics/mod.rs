use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;


lazy_static! {
    pub static ref WATCH_CHANNEL_HIGH_WATER_MARK: IntGauge = IntGauge::new(
        "watch_channel_high_water_mark",
        "Deepest intake buffer occupancy observed across all project watchers"
    )
    .expect("metric can not be created");

    pub static ref WATCH_OVERFLOW_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_overflow_total", "Watchers torn down because their intake buffer was full"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_LOOKUP_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "watch_lookup_failures_total",
        "Membership changes skipped because the namespace could not be resolved"
    )
    .expect("metric can not be created");

    pub static ref WATCH_ACTIVE_WATCHERS: IntGauge = IntGauge::new(
        "watch_active_watchers",
        "Project watchers whose relay task is still running"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER_ONCE: Once = Once::new();

fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(WATCH_CHANNEL_HIGH_WATER_MARK.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCH_OVERFLOW_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCH_LOOKUP_FAILURES_TOTAL.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCH_ACTIVE_WATCHERS.clone()))
        .expect("collector can be registered");
}

/// Export watch metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    REGISTER_ONCE.call_once(|| register_custom_metrics(&REGISTRY));

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode watch metrics: {}", e);
    }

    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            warn!("watch metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
