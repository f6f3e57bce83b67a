//! Background execution: the periodic task scheduler and signal handling.

pub mod scheduler;
#[cfg(feature = "tui")]
pub mod signals;
