//! # Satchel Demo
//!
//! Scripted selector sessions for the `satchel` binary:
//! - TOML configuration naming the world, settings and sessions
//! - A runner that drives each selector through the egui driver

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod scenario;

pub use config::*;
pub use scenario::*;
