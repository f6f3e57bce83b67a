//! Activity logging: JSONL append-only file written by a dedicated thread.

pub mod activity;
pub mod jsonl;
