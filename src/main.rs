#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use downtime_monitor::{MonitorController, PingExecutor, PingMonitorApp, SettingsStore};
use eframe::egui;
use egui::IconData;

fn main() -> eframe::Result {
    env_logger::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| eframe::Error::AppCreation(Box::new(e)))?;

    let (controller, events) =
        MonitorController::new(PingExecutor::new(), SettingsStore::open_default());
    let session = controller.session().clone();
    let monitor = {
        let _guard = runtime.enter();
        controller.spawn()
    };

    let app = PingMonitorApp::new(runtime.handle().clone(), monitor, events, &session);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_resizable(false)
            .with_icon(IconData::default()),
        ..Default::default()
    };
    let result = eframe::run_native(
        "Network Ping Monitor",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    result
}
