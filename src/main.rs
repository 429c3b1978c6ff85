use viewfinder::{app::ViewfinderApp, config::StudioConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = StudioConfig::from_env()?;
    log::info!(
        "Starting studio at {}x{} (vsync {})",
        config.window.width,
        config.window.height,
        config.window.vsync
    );

    ViewfinderApp::run(config)
}
