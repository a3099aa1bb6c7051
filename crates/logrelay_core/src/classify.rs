// classify.rs: separate loopback/health-check traffic from analytics traffic
use crate::parser::LogRecord;

pub const IPV4_LOOPBACK: &str = "127.0.0.1";
pub const IPV6_LOOPBACK: &str = "::1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficClass {
    /// Written verbatim to the untracked sink.
    Internal,
    /// Pseudonymized and written to the tracked sink.
    External,
}

/// Exact literal match; other spellings of loopback are treated as external.
pub fn classify(record: &LogRecord<'_>) -> TrafficClass {
    let addr = record.source_addr;
    if addr == IPV4_LOOPBACK.as_bytes() || addr == IPV6_LOOPBACK.as_bytes() {
        TrafficClass::Internal
    } else {
        TrafficClass::External
    }
}
