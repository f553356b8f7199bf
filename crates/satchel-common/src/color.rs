//! Display colors understood by every rendering backend.

use serde::{Deserialize, Serialize};

/// Named palette color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// Default text color.
    #[default]
    LightGray,
    /// Disabled text.
    DarkGray,
    /// Emphasis.
    White,
    /// User-assigned hotkeys.
    Yellow,
    /// Collation headers, wielded items.
    LightBlue,
    /// Worn items.
    Cyan,
    /// Non-item rows.
    Magenta,
    /// Over capacity, hide-all override.
    Red,
    /// Show-all override, acceptable trade.
    Green,
    /// Highlight for favorites.
    LightGreen,
    /// Brown, used by some item palettes.
    Brown,
}

impl Color {
    /// RGBA components of this color.
    #[must_use]
    pub const fn rgba(self) -> [u8; 4] {
        match self {
            Self::LightGray => [200, 200, 200, 255],
            Self::DarkGray => [110, 110, 110, 255],
            Self::White => [255, 255, 255, 255],
            Self::Yellow => [240, 220, 60, 255],
            Self::LightBlue => [120, 170, 255, 255],
            Self::Cyan => [70, 210, 210, 255],
            Self::Magenta => [210, 80, 210, 255],
            Self::Red => [230, 60, 60, 255],
            Self::Green => [60, 170, 60, 255],
            Self::LightGreen => [120, 230, 120, 255],
            Self::Brown => [160, 110, 50, 255],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_color_is_light_gray() {
        assert_eq!(Color::default(), Color::LightGray);
        assert_eq!(Color::White.rgba(), [255, 255, 255, 255]);
    }
}
