use thiserror::Error;

use crate::settings::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};

/// Errors returned by monitor commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("please enter a valid host or IP address")]
    InvalidHost,
    #[error(
        "interval must be between {min} and {max} seconds, got {0}",
        min = MIN_INTERVAL_SECS,
        max = MAX_INTERVAL_SECS
    )]
    InvalidInterval(u32),
    #[error("monitor is no longer running")]
    Closed,
}
