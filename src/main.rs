mod app;
mod client;
mod pipeline;
mod utils;

use eframe::CreationContext;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([900.0, 720.0])
            .with_min_inner_size([600.0, 520.0]),
        ..Default::default()
    };

    if let Err(err) = eframe::run_native(
        "Photographer Type Analyzer",
        options,
        Box::new(|cc: &CreationContext| Box::new(app::ExifAnalyzer::new(cc))),
    ) {
        tracing::error!("Failed to start UI: {err}");
    }
}
