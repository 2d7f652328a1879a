//! Monitor controller.
//!
//! Owns the probe schedule for one monitoring session. All state mutation
//! happens on the single task running [`MonitorController::run`]; probes run
//! on their own tasks and report back over a channel, and at most one of them
//! is outstanding per session.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::error::MonitorError;
use crate::probe::{PROBE_TIMEOUT, ProbeError, ProbeGateway, ProbeOutcome};
use crate::settings::{PersistedSettings, SettingsStore, is_valid_interval};
use crate::tracker::{AvailabilityState, AvailabilityTracker, Edge};

const COMMAND_QUEUE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Connected,
    Disconnected,
}

impl From<Edge> for AlertKind {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::CameOnline => AlertKind::Connected,
            Edge::WentOffline => AlertKind::Disconnected,
        }
    }
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Started {
        host: String,
    },
    Stopped,
    StatusChanged {
        online: bool,
        detail: String,
        checked_at: DateTime<Local>,
    },
    DowntimeChanged(Duration),
    HistoryAppended(bool),
    Alert(AlertKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSession {
    pub target_host: String,
    pub interval_secs: u32,
    pub muted: bool,
    pub is_running: bool,
}

impl MonitorSession {
    fn from_settings(settings: PersistedSettings) -> Self {
        Self {
            target_host: settings.host,
            interval_secs: settings.interval_secs,
            muted: settings.muted,
            is_running: false,
        }
    }

    fn to_settings(&self) -> PersistedSettings {
        PersistedSettings {
            host: self.target_host.clone(),
            interval_secs: self.interval_secs,
            muted: self.muted,
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_secs))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSnapshot {
    pub session: MonitorSession,
    pub availability: AvailabilityState,
}

enum Command {
    Start {
        host: String,
        interval_secs: u32,
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
    Stop,
    SetInterval {
        secs: u32,
        reply: oneshot::Sender<Result<(), MonitorError>>,
    },
    SetMuted(bool),
    Snapshot(oneshot::Sender<MonitorSnapshot>),
    Shutdown {
        pending_host: Option<String>,
        reply: oneshot::Sender<()>,
    },
}

struct Completion {
    generation: u64,
    outcome: ProbeOutcome,
}

pub struct MonitorController<G> {
    gateway: Arc<G>,
    store: SettingsStore,
    session: MonitorSession,
    /// Host as last written to the store.
    saved_host: String,
    tracker: AvailabilityTracker,
    probe_timeout: Duration,
    /// Bumped on every start so late results from an earlier session are recognised.
    generation: u64,
    in_flight: bool,
    next_tick: Option<Instant>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<G: ProbeGateway> MonitorController<G> {
    /// Creates an idle controller configured from `store`, plus the receiving
    /// end of its notifications.
    pub fn new(gateway: G, store: SettingsStore) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let settings = store.load();
        let (events, events_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let controller = Self {
            gateway: Arc::new(gateway),
            store,
            saved_host: settings.host.clone(),
            session: MonitorSession::from_settings(settings),
            tracker: AvailabilityTracker::new(),
            probe_timeout: PROBE_TIMEOUT,
            generation: 0,
            in_flight: false,
            next_tick: None,
            events,
            completion_tx,
            completion_rx,
        };
        (controller, events_rx)
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn state(&self) -> ControllerState {
        if self.session.is_running {
            ControllerState::Running
        } else {
            ControllerState::Idle
        }
    }

    pub fn session(&self) -> &MonitorSession {
        &self.session
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            session: self.session.clone(),
            availability: self.tracker.snapshot(),
        }
    }

    /// Moves the controller onto its own task and returns a handle to drive it.
    pub fn spawn(self) -> MonitorHandle {
        let (commands, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        tokio::spawn(self.run(commands_rx));
        MonitorHandle { commands }
    }

    pub fn start(&mut self, host: &str, interval_secs: u32) -> Result<(), MonitorError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(MonitorError::InvalidHost);
        }
        if !is_valid_interval(interval_secs) {
            return Err(MonitorError::InvalidInterval(interval_secs));
        }
        if self.session.is_running {
            log::debug!("Already monitoring {}", self.session.target_host);
            return Ok(());
        }

        self.session.target_host = host.to_string();
        self.session.interval_secs = interval_secs;
        self.persist();

        self.tracker.reset();
        self.generation += 1;
        self.in_flight = false;
        self.session.is_running = true;
        log::info!("Monitoring {host} every {interval_secs}s");
        self.emit(MonitorEvent::Started {
            host: host.to_string(),
        });

        self.next_tick = Some(Instant::now() + self.session.interval());
        self.tick();
        Ok(())
    }

    /// Stops scheduling. A probe already in flight is left to finish.
    pub fn stop(&mut self) {
        if !self.session.is_running {
            return;
        }
        self.session.is_running = false;
        self.next_tick = None;
        log::info!("Stopped monitoring {}", self.session.target_host);
        self.emit(MonitorEvent::Stopped);
    }

    /// Changes the probe interval. The tick already scheduled keeps its time.
    pub fn set_interval(&mut self, secs: u32) -> Result<(), MonitorError> {
        if !is_valid_interval(secs) {
            return Err(MonitorError::InvalidInterval(secs));
        }
        self.session.interval_secs = secs;
        self.persist();
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.session.muted = muted;
        self.persist();
    }

    /// Launches a probe unless one is still outstanding. Returns whether a probe was issued.
    pub fn tick(&mut self) -> bool {
        if !self.session.is_running {
            return false;
        }
        if self.in_flight {
            log::debug!(
                "Probe of {} still outstanding, skipping tick",
                self.session.target_host
            );
            return false;
        }
        self.in_flight = true;

        let gateway = Arc::clone(&self.gateway);
        let host = self.session.target_host.clone();
        let timeout = self.probe_timeout;
        let generation = self.generation;
        let done = self.completion_tx.clone();
        tokio::spawn(async move {
            let outcome = gateway.probe(&host, timeout).await;
            let _ = done.send(Completion {
                generation,
                outcome,
            });
        });
        true
    }

    /// Persists the host typed but never started, then stops.
    pub fn shutdown(&mut self, pending_host: Option<&str>) {
        self.stop();
        let pending = pending_host.map(str::trim).filter(|host| !host.is_empty());
        if let Some(host) = pending {
            if host != self.saved_host {
                self.session.target_host = host.to_string();
                self.persist();
            }
        }
    }

    fn on_deadline(&mut self) {
        if !self.session.is_running {
            self.next_tick = None;
            return;
        }
        self.next_tick = Some(Instant::now() + self.session.interval());
        self.tick();
    }

    fn apply(&mut self, completion: Completion) {
        if completion.generation != self.generation {
            log::debug!("Discarding probe result from an earlier session");
            return;
        }
        self.in_flight = false;

        let outcome = completion.outcome;
        if let Some(ProbeError::Transport(cause)) = &outcome.error {
            log::warn!("Probe of {} failed: {cause}", self.session.target_host);
        }

        let delta = self.tracker.record_outcome(&outcome);
        match delta.edge {
            Some(Edge::WentOffline) => log::info!("{} went offline", self.session.target_host),
            Some(Edge::CameOnline) => log::info!(
                "{} is back online, total downtime {}s",
                self.session.target_host,
                delta.total_downtime.as_secs()
            ),
            None => {}
        }

        if !self.session.is_running {
            return;
        }

        self.emit(MonitorEvent::HistoryAppended(delta.online));
        self.emit(MonitorEvent::StatusChanged {
            online: delta.online,
            detail: status_detail(&outcome),
            checked_at: outcome.timestamp,
        });
        self.emit(MonitorEvent::DowntimeChanged(delta.total_downtime));
        if let Some(edge) = delta.edge {
            if !self.session.muted {
                self.emit(MonitorEvent::Alert(edge.into()));
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start {
                host,
                interval_secs,
                reply,
            } => {
                let _ = reply.send(self.start(&host, interval_secs));
            }
            Command::Stop => self.stop(),
            Command::SetInterval { secs, reply } => {
                let _ = reply.send(self.set_interval(secs));
            }
            Command::SetMuted(muted) => self.set_muted(muted),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown { pending_host, reply } => {
                self.shutdown(pending_host.as_deref());
                let _ = reply.send(());
            }
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            let deadline = self.next_tick;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        let finished = matches!(command, Command::Shutdown { .. });
                        self.handle(command);
                        if finished {
                            break;
                        }
                    }
                    None => {
                        self.shutdown(None);
                        break;
                    }
                },
                Some(completion) = self.completion_rx.recv() => self.apply(completion),
                _ = wait_until(deadline) => self.on_deadline(),
            }
        }
    }

    fn persist(&mut self) {
        let settings = self.session.to_settings();
        if self.store.save(&settings) {
            self.saved_host = settings.host;
        }
    }

    fn emit(&self, event: MonitorEvent) {
        // Nobody listening is fine; tracking carries on regardless.
        let _ = self.events.send(event);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn status_detail(outcome: &ProbeOutcome) -> String {
    if outcome.reachable {
        let ms = outcome.latency.unwrap_or_default().as_millis();
        return format!("ONLINE (0% packet loss) - {ms}ms");
    }
    match &outcome.error {
        Some(ProbeError::Timeout) | None => "OFFLINE (100% packet loss)".to_string(),
        Some(cause) => format!("OFFLINE - {cause}"),
    }
}

/// Cloneable front door to a spawned [`MonitorController`].
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
}

impl MonitorHandle {
    pub async fn start(
        &self,
        host: impl Into<String>,
        interval_secs: u32,
    ) -> Result<(), MonitorError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Start {
            host: host.into(),
            interval_secs,
            reply,
        })
        .await?;
        answer.await.map_err(|_| MonitorError::Closed)?
    }

    pub async fn stop(&self) -> Result<(), MonitorError> {
        self.send(Command::Stop).await
    }

    pub async fn set_interval(&self, secs: u32) -> Result<(), MonitorError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::SetInterval { secs, reply }).await?;
        answer.await.map_err(|_| MonitorError::Closed)?
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), MonitorError> {
        self.send(Command::SetMuted(muted)).await
    }

    pub async fn snapshot(&self) -> Result<MonitorSnapshot, MonitorError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        answer.await.map_err(|_| MonitorError::Closed)
    }

    /// Stops monitoring, saves `pending_host` if it differs from the saved one
    /// and ends the controller task.
    pub async fn shutdown(&self, pending_host: Option<String>) -> Result<(), MonitorError> {
        let (reply, answer) = oneshot::channel();
        self.send(Command::Shutdown {
            pending_host,
            reply,
        })
        .await?;
        answer.await.map_err(|_| MonitorError::Closed)
    }

    async fn send(&self, command: Command) -> Result<(), MonitorError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| MonitorError::Closed)
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
