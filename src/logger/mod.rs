//! Activity logging: JSONL append-only lines with graceful degradation.

pub mod activity;
pub mod jsonl;
