//! Observability: Prometheus metrics via a `lazy_static`
//! registry-and-counters pattern.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref LOGINS_TOTAL: IntCounter = IntCounter::new(
        "accountd_logins_total",
        "Successful account logins"
    )
    .expect("metric can be created");

    pub static ref LOGOUTS_TOTAL: IntCounter = IntCounter::new(
        "accountd_logouts_total",
        "Successful account logouts"
    )
    .expect("metric can be created");

    pub static ref HANDOFFS_TOTAL: IntCounter = IntCounter::new(
        "accountd_handoffs_total",
        "LOGIN to CHANNEL handoffs completed"
    )
    .expect("metric can be created");

    pub static ref TRANSITIONS_EXPIRED_TOTAL: IntCounter = IntCounter::new(
        "accountd_transitions_expired_total",
        "Transition sessions force-expired by the sweeper"
    )
    .expect("metric can be created");

    pub static ref PROCESSOR_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "accountd_processor_errors_total",
            "Processor errors by error_code label"
        ),
        &["error_code"]
    )
    .expect("metric can be created");
}

/// Registers every metric exactly once. Call from the composition root
/// before serving `/metrics`.
pub fn register_all() {
    let _ = REGISTRY.register(Box::new(LOGINS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(LOGOUTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HANDOFFS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TRANSITIONS_EXPIRED_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(PROCESSOR_ERRORS_TOTAL.clone()));
}

pub fn record_processor_error(error_code: &str) {
    PROCESSOR_ERRORS_TOTAL.with_label_values(&[error_code]).inc();
}

pub fn record_login() {
    LOGINS_TOTAL.inc();
}

pub fn record_logout() {
    LOGOUTS_TOTAL.inc();
}

pub fn record_handoff() {
    HANDOFFS_TOTAL.inc();
}

pub fn record_transition_expired() {
    TRANSITIONS_EXPIRED_TOTAL.inc();
}

/// Render the registry in the Prometheus text exposition format.
pub fn gather() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("encoding metrics never fails");
    String::from_utf8(buffer).expect("prometheus text output is valid utf8")
}
