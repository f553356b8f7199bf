//! # Satchel egui
//!
//! egui rendering for Satchel selectors.
//!
//! This crate provides:
//! - A `RenderSurface` drawing selector lines into an `egui::Ui`
//! - A headless `UiDriver` running `egui::Context` frames from an event queue
//! - Key bindings translating egui key events into selector actions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod driver;
pub mod keymap;
pub mod surface;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::driver::*;
    pub use crate::keymap::*;
    pub use crate::surface::*;
}

pub use prelude::*;
