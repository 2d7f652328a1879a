//! Availability tracking.
//!
//! Turns a sequence of discrete probe outcomes into continuous downtime
//! accounting plus a bounded history of recent results for the chart.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::probe::ProbeOutcome;

/// Number of recent outcomes kept for the chart.
pub const HISTORY_CAPACITY: usize = 50;

/// Online/offline transition observed on a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    WentOffline,
    CameOnline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityState {
    pub currently_online: bool,
    /// Start of the offline span in progress, if any.
    pub offline_since: Option<DateTime<Local>>,
    /// Downtime of all completed offline spans in this session.
    pub accumulated_downtime: Duration,
    /// Oldest first.
    pub history: VecDeque<bool>,
}

impl Default for AvailabilityState {
    fn default() -> Self {
        Self {
            currently_online: true,
            offline_since: None,
            accumulated_downtime: Duration::ZERO,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }
}

impl AvailabilityState {
    /// Completed downtime plus the offline span still in progress at `now`.
    pub fn total_downtime(&self, now: DateTime<Local>) -> Duration {
        match self.offline_since {
            Some(since) => self.accumulated_downtime + elapsed(since, now),
            None => self.accumulated_downtime,
        }
    }
}

/// What changed after recording one outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDelta {
    pub online: bool,
    pub total_downtime: Duration,
    pub latency: Option<Duration>,
    pub edge: Option<Edge>,
}

#[derive(Debug, Default)]
pub struct AvailabilityTracker {
    state: AvailabilityState,
}

impl AvailabilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one probe outcome and reports the resulting change.
    pub fn record_outcome(&mut self, outcome: &ProbeOutcome) -> StateDelta {
        let now = outcome.timestamp;
        let was_online = self.state.currently_online;
        let reachable = outcome.reachable;

        let edge = match (was_online, reachable) {
            (true, false) => {
                self.state.offline_since = Some(now);
                Some(Edge::WentOffline)
            }
            (false, true) => {
                if let Some(since) = self.state.offline_since.take() {
                    self.state.accumulated_downtime += elapsed(since, now);
                }
                Some(Edge::CameOnline)
            }
            // Still offline: the open span is only projected, never folded in here.
            (false, false) | (true, true) => None,
        };
        self.state.currently_online = reachable;

        if self.state.history.len() >= HISTORY_CAPACITY {
            self.state.history.pop_front();
        }
        self.state.history.push_back(reachable);

        StateDelta {
            online: reachable,
            total_downtime: self.state.total_downtime(now),
            latency: outcome.latency.filter(|_| reachable),
            edge,
        }
    }

    pub fn reset(&mut self) {
        self.state = AvailabilityState::default();
    }

    pub fn snapshot(&self) -> AvailabilityState {
        self.state.clone()
    }

    pub fn history(&self) -> &VecDeque<bool> {
        &self.state.history
    }
}

/// Wall-clock span between two samples; a clock stepping backwards counts as zero.
fn elapsed(from: DateTime<Local>, to: DateTime<Local>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}
