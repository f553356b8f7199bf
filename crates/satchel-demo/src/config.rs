//! Demo configuration.
//!
//! Names the world to load, where inventory settings and key bindings live,
//! the headless screen size and the scripted sessions to run. Relative paths
//! are resolved against the directory of the config file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "satchel.toml";

/// Which selector a scripted session opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Pick one carried item
    Pick,
    /// Choose carried items to drop
    Drop,
    /// Choose nearby items to pick up
    Pickup,
    /// Browse the contents of the first worn container
    Examine,
    /// Choose carried items to put into the first worn container
    Insert,
    /// Choose two items to compare
    Compare,
    /// Trade with the first other character
    Trade,
}

impl ScenarioKind {
    /// Name used in reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pick => "pick",
            Self::Drop => "drop",
            Self::Pickup => "pickup",
            Self::Examine => "examine",
            Self::Insert => "insert",
            Self::Compare => "compare",
            Self::Trade => "trade",
        }
    }
}

/// One scripted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Selector to open
    pub kind: ScenarioKind,
    /// Input steps such as `"text:h"` or `"press:Enter"`
    #[serde(default)]
    pub steps: Vec<String>,
}

impl ScenarioConfig {
    /// Session with the given steps.
    pub fn new<S: Into<String>>(kind: ScenarioKind, steps: impl IntoIterator<Item = S>) -> Self {
        Self {
            kind,
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }
}

/// Demo configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    // === Files ===
    /// RON world description
    pub world_file: PathBuf,
    /// Inventory settings (TOML); `None` uses the platform config directory
    pub settings_file: Option<PathBuf>,
    /// Key bindings (TOML); `None` uses the built-in bindings
    pub keymap_file: Option<PathBuf>,

    // === Screen ===
    /// Headless screen width in points
    pub viewport_width: f32,
    /// Headless screen height in points
    pub viewport_height: f32,
    /// Monospace font size in points
    pub font_size: f32,

    // === Sessions ===
    /// Unit price overrides in cents, by item type
    pub prices: BTreeMap<String, i64>,
    /// Sessions to run, in order
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            world_file: PathBuf::from("camp.ron"),
            settings_file: None,
            keymap_file: None,

            viewport_width: 1200.0,
            viewport_height: 800.0,
            font_size: 14.0,

            prices: BTreeMap::new(),
            scenarios: vec![ScenarioConfig::new(ScenarioKind::Pick, ["text:a"])],
        }
    }
}

impl DemoConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                if let Some(base) = path.parent() {
                    config.resolve_paths(base);
                }
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Makes relative file paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.world_file);
        if let Some(p) = self.settings_file.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.keymap_file.as_mut() {
            resolve(p);
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.viewport_width = self.viewport_width.clamp(320.0, 7680.0);
        self.viewport_height = self.viewport_height.clamp(240.0, 4320.0);
        self.font_size = self.font_size.clamp(6.0, 48.0);
        self.prices.retain(|type_id, cents| {
            if *cents < 0 {
                warn!("Ignoring negative price for {type_id}");
            }
            *cents >= 0
        });
    }
}
