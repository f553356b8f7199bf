//! Per-frame hover and keyboard focus reports.
//!
//! Several selectors may draw in one frame (the trade screen draws two).
//! Whatever the renderer reports as hovered or focused is stored here
//! together with the selector that drew the row, so each selector only acts
//! on reports it owns.

use std::sync::Arc;

use parking_lot::Mutex;
use satchel_common::{EntryId, SelectorId};

/// A row reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTarget {
    /// Selector that drew the row
    pub owner: SelectorId,
    /// Column index inside that selector
    pub column: usize,
    /// Entry identity
    pub entry: EntryId,
}

/// Hover and focus state of the current frame.
#[derive(Debug, Default)]
pub struct FocusBroker {
    hovered: Option<FocusTarget>,
    focused: Option<FocusTarget>,
    frame: u64,
}

/// Broker shared between the selectors of one screen.
pub type SharedFocus = Arc<Mutex<FocusBroker>>;

impl FocusBroker {
    /// Creates a shared broker.
    #[must_use]
    pub fn shared() -> SharedFocus {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Forgets the previous frame's hover. Focus persists until replaced.
    pub fn begin_frame(&mut self) {
        self.hovered = None;
        self.frame += 1;
    }

    /// Frames started so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Records the hovered row.
    pub fn report_hover(&mut self, target: FocusTarget) {
        self.hovered = Some(target);
    }

    /// Records the row holding keyboard focus.
    pub fn report_focus(&mut self, target: FocusTarget) {
        self.focused = Some(target);
    }

    /// Hovered row, if any.
    #[must_use]
    pub const fn hovered(&self) -> Option<FocusTarget> {
        self.hovered
    }

    /// Focused row, if any.
    #[must_use]
    pub const fn focused(&self) -> Option<FocusTarget> {
        self.focused
    }

    /// Focused row, but only when `owner` drew it.
    #[must_use]
    pub fn focused_for(&self, owner: SelectorId) -> Option<FocusTarget> {
        self.focused.filter(|t| t.owner == owner)
    }

    /// Hovered row, but only when `owner` drew it.
    #[must_use]
    pub fn hovered_for(&self, owner: SelectorId) -> Option<FocusTarget> {
        self.hovered.filter(|t| t.owner == owner)
    }

    /// True if `entry` is hovered or focused in a row drawn by `owner`.
    #[must_use]
    pub fn is_mine(&self, owner: SelectorId, entry: EntryId) -> bool {
        self.hovered_for(owner).is_some_and(|t| t.entry == entry)
            || self.focused_for(owner).is_some_and(|t| t.entry == entry)
    }

    /// Drops focus held by `owner`, e.g. when it closes.
    pub fn release(&mut self, owner: SelectorId) {
        if self.focused.is_some_and(|t| t.owner == owner) {
            self.focused = None;
        }
        if self.hovered.is_some_and(|t| t.owner == owner) {
            self.hovered = None;
        }
    }
}
