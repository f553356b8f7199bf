//! Key bindings for selector actions.
//!
//! This module provides:
//! - `KeyBinding` with primary/secondary key chords
//! - Chord parsing (`"Ctrl+Shift+H"`) against egui key names
//! - Conflict detection
//! - TOML load and save

use std::fs;
use std::path::Path;

use egui::{Key, Modifiers};
use satchel_inventory::Action;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while building a keymap.
#[derive(Debug, Error)]
pub enum KeymapError {
    /// Key name egui does not know.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Chord is already bound to another action.
    #[error("Key {key} is already bound to {action}")]
    Conflict {
        /// The conflicting chord.
        key: String,
        /// The action it's bound to.
        action: Action,
    },

    /// Action cannot come from the keyboard.
    #[error("Action {0} is generated by the pointer and cannot be bound")]
    Unbindable(Action),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// TOML write error.
    #[error("TOML write error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type for keymap operations.
pub type KeymapResult<T> = Result<T, KeymapError>;

/// A key plus the modifiers that must be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    /// The key
    pub key: Key,
    /// Ctrl or Cmd held
    pub ctrl: bool,
    /// Shift held
    pub shift: bool,
    /// Alt held
    pub alt: bool,
}

impl KeyChord {
    /// A chord without modifiers.
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    /// Parses `"Ctrl+Shift+H"` style chords.
    pub fn parse(text: &str) -> KeymapResult<Self> {
        let mut parts: Vec<&str> = text.split('+').map(str::trim).collect();
        // A trailing "+" means the plus key itself.
        if text.ends_with('+') && parts.len() > 1 {
            parts.truncate(parts.len() - 2);
            parts.push("Plus");
        }
        let Some((name, modifiers)) = parts.split_last() else {
            return Err(KeymapError::InvalidKey(text.to_string()));
        };
        let key = Key::from_name(name).ok_or_else(|| KeymapError::InvalidKey(text.to_string()))?;
        let mut chord = Self::plain(key);
        for modifier in modifiers {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "cmd" | "command" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" => chord.alt = true,
                _ => return Err(KeymapError::InvalidKey(text.to_string())),
            }
        }
        Ok(chord)
    }

    /// Whether a key event with `modifiers` triggers this chord.
    #[must_use]
    pub fn matches(&self, key: Key, modifiers: Modifiers) -> bool {
        self.key == key
            && self.ctrl == modifiers.command
            && self.shift == modifiers.shift
            && self.alt == modifiers.alt
    }

    /// Text typed alongside the key event, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        if self.ctrl || self.alt {
            return None;
        }
        let symbol = match self.key {
            Key::Space => " ",
            Key::Comma => ",",
            Key::Period => ".",
            Key::Slash => "/",
            Key::Backslash => "\\",
            Key::Minus => "-",
            Key::Plus => "+",
            Key::Equals => "=",
            Key::Semicolon => ";",
            Key::OpenBracket => "[",
            Key::CloseBracket => "]",
            Key::Backtick => "`",
            key => {
                let name = key.name();
                if name.len() != 1 || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return None;
                }
                return Some(if self.shift { name.to_string() } else { name.to_ascii_lowercase() });
            }
        };
        Some(symbol.to_string())
    }

    /// Whether the chord also produces a text event.
    #[must_use]
    pub fn produces_text(&self) -> bool {
        self.text().is_some()
    }
}

impl std::fmt::Display for KeyChord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        f.write_str(self.key.name())
    }
}

/// A key binding with primary and optional secondary chord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// The action this binding is for.
    pub action: Action,
    /// Primary chord.
    pub primary: String,
    /// Secondary chord.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl KeyBinding {
    /// Creates a new key binding.
    #[must_use]
    pub fn new(action: Action, primary: impl Into<String>) -> Self {
        Self {
            action,
            primary: primary.into(),
            secondary: None,
        }
    }

    /// Creates a key binding with secondary chord.
    #[must_use]
    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    /// Returns all bound chords.
    #[must_use]
    pub fn all_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.primary.as_str()];
        if let Some(ref sec) = self.secondary {
            keys.push(sec.as_str());
        }
        keys
    }
}

/// Serialized form of a keymap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeymapFile {
    /// Bindings in file order.
    #[serde(default)]
    pub bindings: Vec<KeyBinding>,
}

/// Default bindings.
#[must_use]
pub fn default_bindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new(Action::Confirm, "Enter"),
        KeyBinding::new(Action::Quit, "Escape"),
        KeyBinding::new(Action::ToggleEntry, "Space").with_secondary("Comma"),
        KeyBinding::new(Action::ToggleNonFavorite, "Ctrl+A"),
        KeyBinding::new(Action::MarkWithCount, "Ctrl+N"),
        KeyBinding::new(Action::IncreaseCount, "ArrowRight"),
        KeyBinding::new(Action::DecreaseCount, "ArrowLeft"),
        KeyBinding::new(Action::ViewCategoryMode, "F2"),
        KeyBinding::new(Action::CategorySelection, "F3"),
        KeyBinding::new(Action::ToggleSkipUnselectable, "F4"),
        KeyBinding::new(Action::ToggleFavorite, "Ctrl+F"),
        KeyBinding::new(Action::ShowHideContents, "Ctrl+H"),
        KeyBinding::new(Action::ShowHideContentsAll, "Ctrl+Shift+H"),
        KeyBinding::new(Action::InventoryFilter, "Slash"),
        KeyBinding::new(Action::ResetFilter, "Ctrl+R"),
        KeyBinding::new(Action::Examine, "Ctrl+I"),
        KeyBinding::new(Action::ExamineContents, "Ctrl+O"),
        KeyBinding::new(Action::Wield, "Ctrl+W"),
        KeyBinding::new(Action::Wear, "Ctrl+E"),
        KeyBinding::new(Action::SwitchLists, "Tab"),
        KeyBinding::new(Action::Autobalance, "Ctrl+B"),
        KeyBinding::new(Action::HelpKeybindings, "F1"),
    ]
}

/// Compiled chord → action table.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<KeyBinding>,
    chords: Vec<(KeyChord, Action)>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bindings = default_bindings();
        let chords = bindings
            .iter()
            .flat_map(|b| {
                b.all_keys()
                    .into_iter()
                    .filter_map(|k| KeyChord::parse(k).ok())
                    .map(|c| (c, b.action))
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { bindings, chords }
    }
}

impl Keymap {
    /// Builds a keymap, rejecting unknown keys and duplicate chords.
    pub fn from_bindings(bindings: Vec<KeyBinding>) -> KeymapResult<Self> {
        let mut chords: Vec<(KeyChord, Action)> = Vec::new();
        for binding in &bindings {
            if matches!(binding.action, Action::Select | Action::AnyInput | Action::MouseMove) {
                return Err(KeymapError::Unbindable(binding.action));
            }
            for key in binding.all_keys() {
                let chord = KeyChord::parse(key)?;
                if let Some((_, action)) = chords.iter().find(|(c, _)| *c == chord) {
                    return Err(KeymapError::Conflict {
                        key: chord.to_string(),
                        action: *action,
                    });
                }
                chords.push((chord, binding.action));
            }
        }
        debug!("Compiled {} key chords", chords.len());
        Ok(Self { bindings, chords })
    }

    /// Parses a TOML keymap.
    pub fn from_toml(text: &str) -> KeymapResult<Self> {
        let file: KeymapFile = toml::from_str(text)?;
        Self::from_bindings(file.bindings)
    }

    /// Serializes the keymap to TOML.
    pub fn to_toml(&self) -> KeymapResult<String> {
        Ok(toml::to_string_pretty(&KeymapFile {
            bindings: self.bindings.clone(),
        })?)
    }

    /// Loads a keymap file.
    pub fn load(path: impl AsRef<Path>) -> KeymapResult<Self> {
        let path = path.as_ref();
        let keymap = Self::from_toml(&fs::read_to_string(path)?)?;
        info!("Loaded keymap from {}", path.display());
        Ok(keymap)
    }

    /// The binding list.
    #[must_use]
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// The chord bound to a key event, if any.
    #[must_use]
    pub fn chord_for(&self, key: Key, modifiers: Modifiers) -> Option<(KeyChord, Action)> {
        self.chords.iter().copied().find(|(c, _)| c.matches(key, modifiers))
    }

    /// The action bound to a key event, if any.
    #[must_use]
    pub fn action_for(&self, key: Key, modifiers: Modifiers) -> Option<Action> {
        self.chord_for(key, modifiers).map(|(_, action)| action)
    }

    /// Chords that trigger `action`, for help text.
    #[must_use]
    pub fn keys_for(&self, action: Action) -> Vec<String> {
        self.chords
            .iter()
            .filter(|(_, a)| *a == action)
            .map(|(c, _)| c.to_string())
            .collect()
    }

    /// One `"ACTION: keys"` line per bound action.
    #[must_use]
    pub fn help_lines(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|b| format!("{}: {}", b.action, self.keys_for(b.action).join(", ")))
            .collect()
    }
}
