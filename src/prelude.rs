//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use termscope::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, TermscopeError};

// Browser
pub use crate::browser::encoding::Encoding;
pub use crate::browser::fetcher::{FetchFailure, HttpTermSource, TermPageRequest, TermSource};
pub use crate::browser::model::{BrowserState, Phase, SegmentFieldRef, TermListing, TermRecord};
pub use crate::browser::runtime::{BrowserProps, Notifier, SnapshotHandle, TermBrowser};

// Logging
pub use crate::logger::activity::ActivityLog;
