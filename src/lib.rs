pub mod app;
pub mod controller;
pub mod dns_cache;
pub mod error;
pub mod ping_executor;
pub mod probe;
pub mod settings;
pub mod tracker;

pub use app::PingMonitorApp;
pub use controller::{
    AlertKind, ControllerState, MonitorController, MonitorEvent, MonitorHandle, MonitorSession,
    MonitorSnapshot,
};
pub use error::MonitorError;
pub use ping_executor::PingExecutor;
pub use probe::{PROBE_TIMEOUT, ProbeError, ProbeGateway, ProbeOutcome};
pub use settings::{PersistedSettings, SettingsStore};
pub use tracker::{AvailabilityState, AvailabilityTracker, Edge, StateDelta};
