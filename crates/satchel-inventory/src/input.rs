//! Named input actions.
//!
//! Key binding itself happens in the rendering layer; selectors only see
//! action names plus the raw character for quick-select lookups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failed to parse an action name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown action: {0}")]
pub struct ActionParseError(pub String);

/// An input action understood by selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Accept the current selection
    Confirm,
    /// Leave without a result
    Quit,
    /// Mouse click on a row
    Select,
    /// Raw key press
    AnyInput,
    /// Toggle the highlighted entry
    ToggleEntry,
    /// Toggle the first non-favorite, non-worn entry
    ToggleNonFavorite,
    /// Ask for a count, then select that many
    MarkWithCount,
    /// Choose one more unit
    IncreaseCount,
    /// Choose one unit less
    DecreaseCount,
    /// Switch between hierarchy and categories
    ViewCategoryMode,
    /// Switch item/category navigation
    CategorySelection,
    /// Flip the favorite flag
    ToggleFavorite,
    /// Fold or unfold one entry
    ShowHideContents,
    /// Cycle the column-wide fold override
    ShowHideContentsAll,
    /// Skip unselectable rows when navigating
    ToggleSkipUnselectable,
    /// Edit the filter
    InventoryFilter,
    /// Clear the filter
    ResetFilter,
    /// Examine the highlighted item
    Examine,
    /// Browse the highlighted container
    ExamineContents,
    /// Wield the highlighted item
    Wield,
    /// Wear the highlighted item
    Wear,
    /// Switch trade pane
    SwitchLists,
    /// Close the trade balance with the highlighted item
    Autobalance,
    /// Pointer moved
    MouseMove,
    /// Show key bindings
    HelpKeybindings,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 25] = [
        Self::Confirm,
        Self::Quit,
        Self::Select,
        Self::AnyInput,
        Self::ToggleEntry,
        Self::ToggleNonFavorite,
        Self::MarkWithCount,
        Self::IncreaseCount,
        Self::DecreaseCount,
        Self::ViewCategoryMode,
        Self::CategorySelection,
        Self::ToggleFavorite,
        Self::ShowHideContents,
        Self::ShowHideContentsAll,
        Self::ToggleSkipUnselectable,
        Self::InventoryFilter,
        Self::ResetFilter,
        Self::Examine,
        Self::ExamineContents,
        Self::Wield,
        Self::Wear,
        Self::SwitchLists,
        Self::Autobalance,
        Self::MouseMove,
        Self::HelpKeybindings,
    ];

    /// Canonical action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "CONFIRM",
            Self::Quit => "QUIT",
            Self::Select => "SELECT",
            Self::AnyInput => "ANY_INPUT",
            Self::ToggleEntry => "TOGGLE_ENTRY",
            Self::ToggleNonFavorite => "TOGGLE_NON_FAVORITE",
            Self::MarkWithCount => "MARK_WITH_COUNT",
            Self::IncreaseCount => "INCREASE_COUNT",
            Self::DecreaseCount => "DECREASE_COUNT",
            Self::ViewCategoryMode => "VIEW_CATEGORY_MODE",
            Self::CategorySelection => "CATEGORY_SELECTION",
            Self::ToggleFavorite => "TOGGLE_FAVORITE",
            Self::ShowHideContents => "SHOW_HIDE_CONTENTS",
            Self::ShowHideContentsAll => "SHOW_HIDE_CONTENTS_ALL",
            Self::ToggleSkipUnselectable => "TOGGLE_SKIP_UNSELECTABLE",
            Self::InventoryFilter => "INVENTORY_FILTER",
            Self::ResetFilter => "RESET_FILTER",
            Self::Examine => "EXAMINE",
            Self::ExamineContents => "EXAMINE_CONTENTS",
            Self::Wield => "WIELD",
            Self::Wear => "WEAR",
            Self::SwitchLists => "SWITCH_LISTS",
            Self::Autobalance => "AUTOBALANCE",
            Self::MouseMove => "MOUSE_MOVE",
            Self::HelpKeybindings => "HELP_KEYBINDINGS",
        }
    }

    /// Changes the visibility of contained entries.
    #[must_use]
    pub const fn is_show_hide(self) -> bool {
        matches!(self, Self::ShowHideContents | Self::ShowHideContentsAll)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ActionParseError(s.to_string()))
    }
}

/// One input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryInput {
    /// Action name
    pub action: Action,
    /// Raw character, for quick-select keys and typed counts
    pub ch: Option<char>,
}

impl InventoryInput {
    /// An action without a character.
    #[must_use]
    pub const fn action(action: Action) -> Self {
        Self { action, ch: None }
    }

    /// A raw key press.
    #[must_use]
    pub const fn key(ch: char) -> Self {
        Self {
            action: Action::AnyInput,
            ch: Some(ch),
        }
    }
}

impl From<Action> for InventoryInput {
    fn from(action: Action) -> Self {
        Self::action(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_action() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>(), Ok(action));
        }
    }

    #[test]
    fn test_parse_unknown() {
        let err = "JUMP".parse::<Action>().expect_err("unknown action");
        assert_eq!(err.to_string(), "Unknown action: JUMP");
    }

    #[test]
    fn test_serde_names_match() {
        let json = serde_json::to_string(&Action::ShowHideContentsAll).expect("serialize");
        assert_eq!(json, "\"SHOW_HIDE_CONTENTS_ALL\"");
        let key = InventoryInput::key('a');
        assert_eq!(key.action, Action::AnyInput);
    }
}
