//! Inventory settings persistence.
//!
//! This module provides:
//! - Layout tunables (overflow threshold, selection column width, invlets)
//! - Per-context UI modes (hierarchy or categories) remembered between sessions
//! - Load/save to a TOML file with dirty tracking

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Default settings file name.
pub const SETTINGS_FILE_NAME: &str = "inventory.toml";

/// Default settings directory (relative to config).
pub const SETTINGS_DIR_NAME: &str = "satchel";

/// Errors that can occur during settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// Settings file not found.
    #[error("Settings file not found: {0}")]
    NotFound(String),

    /// Invalid settings value.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// How a selector organizes entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Nested under physical parents, indented
    Hierarchy,
    /// Grouped by item category, flat
    #[default]
    Categories,
}

impl UiMode {
    /// Returns the other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Hierarchy => Self::Categories,
            Self::Categories => Self::Hierarchy,
        }
    }

    /// Returns display name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Hierarchy => "Hierarchy",
            Self::Categories => "Categories",
        }
    }
}

/// Which items show container capacity in their caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailedContainers {
    /// Never
    None,
    /// Worn containers only
    #[default]
    Worn,
    /// Every container
    All,
}

/// How parent/child highlighting is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightStyle {
    /// `<` and `>` markers
    #[default]
    Symbol,
    /// Inverted colors
    Color,
}

/// Layout tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Share of the client width above which side columns merge into the
    /// own-inventory column.
    pub overflow_threshold: f32,
    /// Below this client width the selection column is hidden.
    pub selection_column_min_width: f32,
    /// Container capacity detail in captions.
    pub detailed_containers: DetailedContainers,
    /// Reserve room for item symbols.
    pub item_symbols: bool,
    /// Parent/child highlight style.
    pub highlight_style: HighlightStyle,
    /// Key pool for alphabetic quick-select letters.
    pub pickup_hotkeys: String,
    /// Hand out quick-select keys at all.
    pub numeric_invlets: bool,
    /// Width of one character cell in pixels.
    pub font_width: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            overflow_threshold: 0.6,
            selection_column_min_width: 700.0,
            detailed_containers: DetailedContainers::default(),
            item_symbols: false,
            highlight_style: HighlightStyle::default(),
            pickup_hotkeys: "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ:;".to_string(),
            numeric_invlets: true,
            font_width: 8.0,
        }
    }
}

/// Selector contexts that remember their own mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiContext {
    /// Generic item selectors
    InventorySel,
    /// The inventory screen
    InventoryUi,
    /// Pickup selectors
    PickupSel,
    /// The pickup screen
    PickupUi,
}

/// Remembered modes per context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedModes {
    /// Generic item selectors
    pub inventory_sel: UiMode,
    /// The inventory screen
    pub inventory_ui: UiMode,
    /// Pickup selectors
    pub pickup_sel: UiMode,
    /// The pickup screen
    pub pickup_ui: UiMode,
}

impl Default for SavedModes {
    fn default() -> Self {
        Self {
            inventory_sel: UiMode::Categories,
            inventory_ui: UiMode::Categories,
            pickup_sel: UiMode::Categories,
            pickup_ui: UiMode::Hierarchy,
        }
    }
}

impl SavedModes {
    /// Mode remembered for a context.
    #[must_use]
    pub const fn get(&self, context: UiContext) -> UiMode {
        match context {
            UiContext::InventorySel => self.inventory_sel,
            UiContext::InventoryUi => self.inventory_ui,
            UiContext::PickupSel => self.pickup_sel,
            UiContext::PickupUi => self.pickup_ui,
        }
    }

    /// Remembers a mode.
    pub fn set(&mut self, context: UiContext, mode: UiMode) {
        match context {
            UiContext::InventorySel => self.inventory_sel = mode,
            UiContext::InventoryUi => self.inventory_ui = mode,
            UiContext::PickupSel => self.pickup_sel = mode,
            UiContext::PickupUi => self.pickup_ui = mode,
        }
    }
}

/// All persisted inventory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    /// Settings format version.
    pub version: u32,
    /// Layout tunables.
    pub layout: LayoutSettings,
    /// Remembered modes.
    pub modes: SavedModes,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            version: 1,
            layout: LayoutSettings::default(),
            modes: SavedModes::default(),
        }
    }
}

impl InventorySettings {
    /// Creates default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates all settings values.
    pub fn validate(&mut self) {
        self.layout.overflow_threshold = self.layout.overflow_threshold.clamp(0.1, 1.0);
        self.layout.selection_column_min_width =
            self.layout.selection_column_min_width.clamp(0.0, 4096.0);
        self.layout.font_width = self.layout.font_width.clamp(1.0, 64.0);

        // Duplicate hotkeys would make two entries answer the same key
        let mut seen = Vec::new();
        self.layout.pickup_hotkeys.retain(|c| {
            if seen.contains(&c) {
                false
            } else {
                seen.push(c);
                true
            }
        });
    }

    /// Serializes to TOML string.
    pub fn to_toml(&self) -> SettingsResult<String> {
        let toml = toml::to_string_pretty(self)?;
        Ok(toml)
    }

    /// Deserializes from TOML string.
    pub fn from_toml(toml: &str) -> SettingsResult<Self> {
        let mut settings: Self = toml::from_str(toml)?;
        if settings.version == 0 {
            return Err(SettingsError::InvalidValue("version 0".to_string()));
        }
        settings.validate();
        Ok(settings)
    }
}

/// Loads and saves [`InventorySettings`].
pub struct SettingsStore {
    /// Current settings.
    settings: InventorySettings,
    /// Path to settings file.
    settings_path: PathBuf,
    /// Whether settings have been modified since last save.
    dirty: bool,
    /// Auto-save on change.
    auto_save: bool,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    /// Creates a store with the default path.
    #[must_use]
    pub fn new() -> Self {
        Self::with_path(Self::default_settings_path())
    }

    /// Creates a store with a custom path.
    #[must_use]
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            settings: InventorySettings::default(),
            settings_path: path.as_ref().to_path_buf(),
            dirty: false,
            auto_save: true,
        }
    }

    /// Returns the default settings path.
    #[must_use]
    pub fn default_settings_path() -> PathBuf {
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir)
                .join(SETTINGS_DIR_NAME)
                .join(SETTINGS_FILE_NAME);
        }

        if let Some(config) = dirs::config_dir() {
            return config.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME);
        }

        PathBuf::from(SETTINGS_FILE_NAME)
    }

    /// Returns the current settings path.
    #[must_use]
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Returns a reference to the current settings.
    #[must_use]
    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    /// Returns a mutable reference to the current settings.
    pub fn settings_mut(&mut self) -> &mut InventorySettings {
        self.dirty = true;
        &mut self.settings
    }

    /// Returns whether settings have been modified.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sets auto-save on change.
    pub fn set_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    /// Remembers the mode a selector ended with.
    pub fn remember_mode(&mut self, context: UiContext, mode: UiMode) {
        if self.settings.modes.get(context) != mode {
            self.settings.modes.set(context, mode);
            self.dirty = true;
        }
    }

    /// Loads settings from file.
    pub fn load(&mut self) -> SettingsResult<()> {
        if !self.settings_path.exists() {
            info!("Inventory settings not found, using defaults");
            self.settings = InventorySettings::default();
            self.dirty = true;
            return Ok(());
        }

        let contents = fs::read_to_string(&self.settings_path)?;
        self.settings = InventorySettings::from_toml(&contents)?;
        self.dirty = false;

        info!("Inventory settings loaded from {:?}", self.settings_path);
        Ok(())
    }

    /// Loads settings, keeping defaults when the file cannot be read.
    pub fn load_or_default(&mut self) {
        if let Err(e) = self.load() {
            warn!("Failed to load inventory settings: {e}");
            self.settings = InventorySettings::default();
        }
    }

    /// Saves settings to file.
    pub fn save(&mut self) -> SettingsResult<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml = self.settings.to_toml()?;
        fs::write(&self.settings_path, toml)?;
        self.dirty = false;

        info!("Inventory settings saved to {:?}", self.settings_path);
        Ok(())
    }

    /// Saves if dirty and auto-save is enabled.
    pub fn auto_save_if_dirty(&mut self) -> SettingsResult<()> {
        if self.auto_save && self.dirty {
            self.save()?;
        }
        Ok(())
    }

    /// Resets settings to defaults.
    pub fn reset_to_defaults(&mut self) {
        self.settings = InventorySettings::default();
        self.dirty = true;
        info!("Inventory settings reset to defaults");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_modes() {
        let modes = SavedModes::default();
        assert_eq!(modes.get(UiContext::InventorySel), UiMode::Categories);
        assert_eq!(modes.get(UiContext::PickupUi), UiMode::Hierarchy);
        assert_eq!(UiMode::Hierarchy.toggled(), UiMode::Categories);
    }

    #[test]
    fn test_validate_clamps() {
        let mut settings = InventorySettings::default();
        settings.layout.overflow_threshold = 7.5;
        settings.layout.pickup_hotkeys = "aab".to_string();
        settings.validate();
        assert!((settings.layout.overflow_threshold - 1.0).abs() < 0.001);
        assert_eq!(settings.layout.pickup_hotkeys, "ab");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut settings = InventorySettings::default();
        settings.layout.detailed_containers = DetailedContainers::All;
        let toml = settings.to_toml().expect("Serialize failed");
        assert!(toml.contains("detailed_containers = \"all\""));
        let loaded = InventorySettings::from_toml(&toml).expect("Deserialize failed");
        assert_eq!(loaded.layout.detailed_containers, DetailedContainers::All);
        assert_eq!(loaded.modes, settings.modes);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded = InventorySettings::from_toml("[modes]\npickup_ui = \"categories\"\n")
            .expect("Deserialize failed");
        assert_eq!(loaded.modes.pickup_ui, UiMode::Categories);
        assert!((loaded.layout.overflow_threshold - 0.6).abs() < 0.001);
    }

    #[test]
    fn test_store_save_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        let mut store = SettingsStore::with_path(&path);
        store.remember_mode(UiContext::InventorySel, UiMode::Hierarchy);
        assert!(store.is_dirty());
        store.save().expect("Save failed");
        assert!(!store.is_dirty());

        let mut other = SettingsStore::with_path(&path);
        other.load().expect("Load failed");
        assert_eq!(
            other.settings().modes.get(UiContext::InventorySel),
            UiMode::Hierarchy
        );
    }

    #[test]
    fn test_store_missing_file_marks_dirty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SettingsStore::with_path(dir.path().join("absent.toml"));
        store.load().expect("Load failed");
        assert!(store.is_dirty());
        store.auto_save_if_dirty().expect("Save failed");
        assert!(store.settings_path().exists());
    }

    #[test]
    fn test_store_bad_file_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        fs::write(&path, "layout = 3").expect("write");
        let mut store = SettingsStore::with_path(&path);
        assert!(store.load().is_err());
        store.load_or_default();
        assert_eq!(store.settings().version, 1);
    }
}
