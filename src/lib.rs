//! # BibTeX Paper Downloader
//!
//! Downloads the papers cataloged in a BibTeX file from a publisher
//! repository and records the local PDF path in the `file` field of each
//! entry, leaving every other field untouched.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: The BibTeX database and the per-entry [`Paper`] state machine
//! - [`repository`]: Publisher plugins behind the [`PaperRepository`] trait and
//!   the registry resolving them by name
//! - [`downloader`]: The orchestrator running one download pass over a file
//! - [`utils`]: Field decoding, HTTP fetching and file naming
//! - [`config`]: Configuration management

pub mod config;
pub mod downloader;
pub mod models;
pub mod repository;
pub mod utils;

// Re-export commonly used types
pub use downloader::{DownloadError, Downloader, RunSummary};
pub use models::Paper;
pub use repository::{PaperRepository, RepositoryRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
