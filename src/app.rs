//! Desktop front end: forwards user intents to the monitor and renders its
//! notifications.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Local};
use eframe::egui;
use egui::UserAttentionType;
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Vec2};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::controller::{AlertKind, MonitorEvent, MonitorHandle, MonitorSession};
use crate::settings::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};
use crate::tracker::HISTORY_CAPACITY;

/// Formats a duration as `HH:MM:SS`. Hours keep counting past 24.
pub fn format_downtime(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

pub struct PingMonitorApp {
    runtime: Handle,
    monitor: MonitorHandle,
    events: mpsc::UnboundedReceiver<MonitorEvent>,
    host_input: String,
    interval_secs: u32,
    muted: bool,
    is_monitoring: bool,
    status: String,
    status_online: Option<bool>,
    downtime: Duration,
    last_check: Option<DateTime<Local>>,
    history: VecDeque<bool>,
    error: Option<String>,
    closing: bool,
}

impl PingMonitorApp {
    pub fn new(
        runtime: Handle,
        monitor: MonitorHandle,
        events: mpsc::UnboundedReceiver<MonitorEvent>,
        session: &MonitorSession,
    ) -> Self {
        Self {
            runtime,
            monitor,
            events,
            host_input: session.target_host.clone(),
            interval_secs: session.interval_secs,
            muted: session.muted,
            is_monitoring: false,
            status: "Not monitoring".to_string(),
            status_online: None,
            downtime: Duration::ZERO,
            last_check: None,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            error: None,
            closing: false,
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                MonitorEvent::Started { host } => {
                    self.is_monitoring = true;
                    self.history.clear();
                    self.downtime = Duration::ZERO;
                    self.status = format!("Monitoring {host}");
                    self.status_online = None;
                }
                MonitorEvent::Stopped => {
                    self.is_monitoring = false;
                    self.status = "Monitoring stopped".to_string();
                    self.status_online = None;
                }
                MonitorEvent::StatusChanged {
                    online,
                    detail,
                    checked_at,
                } => {
                    self.status = detail;
                    self.status_online = Some(online);
                    self.last_check = Some(checked_at);
                }
                MonitorEvent::DowntimeChanged(downtime) => self.downtime = downtime,
                MonitorEvent::HistoryAppended(online) => {
                    if self.history.len() >= HISTORY_CAPACITY {
                        self.history.pop_front();
                    }
                    self.history.push_back(online);
                }
                MonitorEvent::Alert(kind) => {
                    log::info!("Alert: {kind:?}");
                    let attention = match kind {
                        AlertKind::Disconnected => UserAttentionType::Critical,
                        AlertKind::Connected => UserAttentionType::Informational,
                    };
                    ctx.send_viewport_cmd(egui::ViewportCommand::RequestUserAttention(attention));
                }
            }
        }
    }

    fn toggle_monitoring(&mut self) {
        self.error = None;
        if self.is_monitoring {
            if let Err(e) = self.runtime.block_on(self.monitor.stop()) {
                self.error = Some(e.to_string());
            }
            return;
        }
        let result = self
            .runtime
            .block_on(self.monitor.start(self.host_input.trim(), self.interval_secs));
        if let Err(e) = result {
            self.error = Some(e.to_string());
        }
    }

    fn draw_chart(&self, ui: &mut egui::Ui) {
        let size = Vec2::new(ui.available_width(), ui.available_height().max(120.0));
        let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, Color32::WHITE);

        let left = rect.left() + 60.0;
        let width = rect.right() - 10.0 - left;
        let top = rect.top() + 20.0;
        let half = (rect.height() - 40.0) / 2.0;
        let middle = top + half;
        let bottom = top + 2.0 * half;

        let grid = Stroke::new(1.0, Color32::LIGHT_GRAY);
        for y in [top, middle, bottom] {
            painter.line_segment([Pos2::new(left, y), Pos2::new(left + width, y)], grid);
        }
        let font = FontId::proportional(11.0);
        painter.text(
            Pos2::new(rect.left() + 5.0, top),
            Align2::LEFT_CENTER,
            "ONLINE",
            font.clone(),
            Color32::BLACK,
        );
        painter.text(
            Pos2::new(rect.left() + 5.0, bottom),
            Align2::LEFT_CENTER,
            "OFFLINE",
            font,
            Color32::BLACK,
        );

        let bar_width = (width / HISTORY_CAPACITY as f32).max(1.0);
        for (i, &online) in self.history.iter().enumerate() {
            let x = left + i as f32 * bar_width;
            let (y, color) = if online {
                (top, Color32::from_rgb(0, 160, 0))
            } else {
                (middle, Color32::RED)
            };
            let bar = Rect::from_min_size(Pos2::new(x, y), Vec2::new(bar_width - 1.0, half));
            painter.rect_filled(bar, 0.0, color);
        }
    }
}

impl eframe::App for PingMonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);

        if ctx.input(|i| i.viewport().close_requested()) && !self.closing {
            self.closing = true;
            let pending = Some(self.host_input.clone());
            if let Err(e) = self.runtime.block_on(self.monitor.shutdown(pending)) {
                log::warn!("Monitor did not shut down cleanly: {e}");
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Target Host/IP:");
                ui.add_enabled(
                    !self.is_monitoring,
                    egui::TextEdit::singleline(&mut self.host_input).desired_width(200.0),
                );
                let label = if self.is_monitoring {
                    "Stop Monitoring"
                } else {
                    "Start Monitoring"
                };
                if ui.button(label).clicked() {
                    self.toggle_monitoring();
                }
            });

            ui.horizontal(|ui| {
                let slider = egui::Slider::new(
                    &mut self.interval_secs,
                    MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS,
                )
                .text("interval (s)");
                if ui.add(slider).changed() {
                    let result = self
                        .runtime
                        .block_on(self.monitor.set_interval(self.interval_secs));
                    if let Err(e) = result {
                        self.error = Some(e.to_string());
                    }
                }
                if ui.checkbox(&mut self.muted, "Mute alerts").changed() {
                    if let Err(e) = self.runtime.block_on(self.monitor.set_muted(self.muted)) {
                        self.error = Some(e.to_string());
                    }
                }
            });

            if let Some(error) = &self.error {
                ui.colored_label(Color32::RED, format!("Error: {error}"));
            }

            let status_color = match self.status_online {
                Some(true) => Color32::from_rgb(0, 160, 0),
                Some(false) => Color32::RED,
                None => ui.visuals().text_color(),
            };
            ui.colored_label(status_color, format!("Status: {}", self.status));
            ui.label(format!("Total Downtime: {}", format_downtime(self.downtime)));
            ui.label(match self.last_check {
                Some(at) => format!("Last Check: {}", at.format("%Y-%m-%d %H:%M:%S")),
                None => "Last Check: Never".to_string(),
            });

            ui.separator();
            self.draw_chart(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(250));
    }
}
