use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;

/// How long a single echo request may take before it counts as lost.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a probe did not come back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,
    #[error("could not resolve {0}")]
    Resolve(String),
    #[error("{0}")]
    Transport(String),
}

/// Result of one reachability check.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub timestamp: DateTime<Local>,
    pub reachable: bool,
    pub latency: Option<Duration>,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    pub fn success(timestamp: DateTime<Local>, latency: Duration) -> Self {
        Self {
            timestamp,
            reachable: true,
            latency: Some(latency),
            error: None,
        }
    }

    pub fn failure(timestamp: DateTime<Local>, error: ProbeError) -> Self {
        Self {
            timestamp,
            reachable: false,
            latency: None,
            error: Some(error),
        }
    }
}

/// Issues a single timed echo request against a host.
///
/// Implementations must never block the calling task; transport problems are
/// reported as an unreachable [`ProbeOutcome`] rather than an `Err`.
pub trait ProbeGateway: Send + Sync + 'static {
    fn probe(&self, host: &str, timeout: Duration) -> impl Future<Output = ProbeOutcome> + Send;
}
