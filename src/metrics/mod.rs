//! Metrics pipeline: backend client, range-query alignment, threshold colors.

pub mod backend;
pub mod query;
pub mod threshold;
