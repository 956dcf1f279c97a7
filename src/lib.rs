#![forbid(unsafe_code)]

//! termscope: a paginated, encoding-aware browser over a search index's term
//! dictionary.
//!
//! The browser shows the terms of one field in one index segment, a page at a
//! time, together with field-level aggregates. Terms can be re-decoded under a
//! different encoding; a backend rejection rolls the view back to the last
//! good state and notifies the host.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use termscope::prelude::*;
//!
//! # fn main() -> termscope::core::errors::Result<()> {
//! let config = Config::load(None)?;
//! let source = HttpTermSource::new(
//!     config.server.url()?,
//!     config.server.connect_timeout(),
//!     config.server.request_timeout(),
//! )?;
//! let props = BrowserProps::new(1, "title").with_page_size(config.browse.page_size);
//! let mut browser = TermBrowser::new(props, Arc::new(source), |msg: &str| eprintln!("{msg}"))?;
//! browser.mount()?;
//! browser.wait(std::time::Duration::from_secs(10))?;
//! println!("{}", termscope::browser::render::render(browser.state(), browser.phase()));
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod browser;
pub mod core;
pub mod logger;
