//! Term dictionary browser: query, pagination and encoding state machine.
//!
//! Seams follow the model/update/runtime split: `model` holds the data,
//! `update` is the pure transition function, `runtime` executes fetch and
//! notify commands, and `render` projects a snapshot to text.

#![allow(missing_docs)]

pub mod accumulator;
pub mod encoding;
pub mod fetcher;
pub mod model;
pub mod render;
pub mod runtime;
pub mod update;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod test_properties;

pub use encoding::Encoding;
pub use fetcher::{FetchFailure, HttpTermSource, TermPageRequest, TermSource};
pub use model::{BrowserState, Phase, SegmentFieldRef, TermListing, TermRecord};
pub use runtime::{BrowserProps, Notifier, Snapshot, SnapshotHandle, TermBrowser};
