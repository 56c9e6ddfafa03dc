#[cfg(feature = "gui")]
mod app;

#[cfg(feature = "gui")]
pub fn launch(config: crate::config::Config) -> anyhow::Result<()> {
    let dispatcher = crate::core::dispatcher::Dispatcher::from_config(&config)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([640.0, 620.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Top Songs",
        options,
        Box::new(move |cc| Ok(Box::new(app::TopSongsApp::new(cc, config, dispatcher)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI failed: {}", e))
}
