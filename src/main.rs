use asset_inspection_dashboard::app::InspectionDashboardApp;
use asset_inspection_dashboard::config::DashboardConfig;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DashboardConfig::load()?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    let title = config.window_title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(InspectionDashboardApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("running dashboard window: {e}"))
}
