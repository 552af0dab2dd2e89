//! Process-wide prometheus counters.

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref FRAMES: IntCounter =
        register_int_counter!("plate_ledger_frames_total", "Frames read from the source")
            .expect("metric registration");
    pub static ref REGIONS: IntCounterVec = register_int_counter_vec!(
        "plate_ledger_regions_total",
        "Detected regions by processing outcome",
        &["outcome"]
    )
    .expect("metric registration");
    pub static ref REGION_ERRORS: IntCounter = register_int_counter!(
        "plate_ledger_region_errors_total",
        "Regions dropped on recognition or ledger failure"
    )
    .expect("metric registration");
}

/// Text exposition of every registered metric.
pub fn render() -> String {
    lazy_static::initialize(&FRAMES);
    lazy_static::initialize(&REGIONS);
    lazy_static::initialize(&REGION_ERRORS);

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
