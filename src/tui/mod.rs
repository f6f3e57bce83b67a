//! Dashboard surface: layout, glyphs, state machine, rendering and runtime.
//!
//! Everything except terminal I/O is pure and builds without the `tui`
//! feature; the runtime, terminal guard and key mapping need crossterm.

#![allow(missing_docs)]

pub mod glyphs;
pub mod input;
pub mod layout;
pub mod model;
pub mod render;
#[cfg(feature = "tui")]
pub mod runtime;
pub mod sync;
#[cfg(feature = "tui")]
pub mod terminal_guard;
pub mod theme;
pub mod update;

#[cfg(test)]
mod test_properties;

#[cfg(feature = "tui")]
pub use runtime::run_dashboard;
