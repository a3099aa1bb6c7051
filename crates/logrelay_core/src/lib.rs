// logrelay_core: privacy-preserving access-log relay. Parses pipe-delimited
// access-log lines, pseudonymizes client identity with a daily salted token,
// separates internal traffic, and writes through rotation-safe output handles.
pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod output;
pub mod parser;
pub mod pseudonym;
pub mod pump;
pub mod referrer;
pub mod rotation;

pub use classify::{classify, TrafficClass};
pub use config::RelayConfig;
pub use error::{ParseError, RelayError, Result};
pub use format::format_tracked_line;
pub use output::{OutputRouter, OutputTarget, SinkKind};
pub use parser::{parse_line, LogRecord};
pub use pseudonym::{tokenize, Salt, SaltProvider, Token};
pub use pump::{open_input, PumpStats, StreamPump};
pub use referrer::sanitize_referrer;
pub use rotation::{RotationCoordinator, RotationRequests, RotationState, RotationWatcher};
