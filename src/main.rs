//! Ember - entity/component lifecycle demo
//!
//! Loads settings, builds a small scene and runs it for a fixed number of
//! frames.

mod demo;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use ember_ecs::App;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use settings::Settings;

fn main() -> Result<()> {
    let path = std::env::args().nth(1).map(PathBuf::from);

    // The subscriber depends on settings, so messages from loading them are
    // not recorded.
    let settings = Settings::load(path.as_deref());

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.level))
        .context("Invalid log filter")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Ember demo...");

    let mut app = App::with_systems(settings.app.clone(), demo::systems());
    demo::register_classes(&mut app, &settings.demo);
    let squad = demo::populate(&mut app, &settings.demo);

    demo::run(&mut app, &settings.demo);

    info!(
        frames = app.frame(),
        live = app.entity_count(),
        squad_alive = app.is_alive(squad),
        "Demo finished"
    );
    Ok(())
}
