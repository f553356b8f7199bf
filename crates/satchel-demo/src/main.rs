//! # Satchel
//!
//! Runs scripted inventory sessions against a RON world and prints what
//! each selector returned as JSON.
//!
//! Usage: `satchel [config.toml]`
//!
//! - The world, settings and key bindings are named by the config
//! - Each session draws on a headless egui context fed from its script
//! - View modes the sessions end in are remembered in the settings file

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use satchel_demo::{DemoConfig, ScenarioRunner, CONFIG_FILE};
use satchel_egui::Keymap;
use satchel_inventory::{SettingsStore, WorldSpec};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("satchel=info".parse()?))
        .init();

    info!("Satchel starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    let mut config = DemoConfig::load_from(&config_path);
    config.validate();

    let spec = WorldSpec::load(&config.world_file)
        .with_context(|| format!("loading world {}", config.world_file.display()))?;
    let keymap = match &config.keymap_file {
        Some(path) => Keymap::load(path).with_context(|| format!("loading keymap {}", path.display()))?,
        None => Keymap::default(),
    };
    let mut store = match &config.settings_file {
        Some(path) => SettingsStore::with_path(path),
        None => SettingsStore::new(),
    };
    store.load_or_default();

    let settings = store.settings();
    let mut runner =
        ScenarioRunner::new(spec, keymap, &config).with_settings(settings.layout.clone(), settings.modes);

    let mut reports = Vec::with_capacity(config.scenarios.len());
    for scenario in &config.scenarios {
        let report = runner
            .run(scenario)
            .with_context(|| format!("running {} session", scenario.kind.name()))?;
        if let Some((context, mode)) = report.ui_mode {
            runner.remember_mode(context, mode);
            store.remember_mode(context, mode);
        }
        reports.push(report);
    }
    println!("{}", serde_json::to_string_pretty(&reports)?);

    store.auto_save_if_dirty()?;
    info!("Satchel finished {} sessions", reports.len());
    Ok(())
}
