//! Utility modules shared by the repositories, the paper model and the
//! downloader.
//!
//! - [`codec`]: decode raw BibTeX field values into plain strings
//! - [`HttpClient`]: run-scoped HTTP client with a shared cookie jar
//! - [`first_match`] / [`extract_first_match`]: pull one value out of a page
//! - [`pdf_file_name`]: stable, human-readable names for downloaded PDFs
//!
//! # Extracting a value from a page
//!
//! ```rust
//! use bibtex_paper_downloader::utils::extract_first_match;
//!
//! let html = r#"<frame src="http://example.org/paper.pdf" frameborder="0">"#;
//! let url = extract_first_match(html, r#"<frame src="([^"]+)""#).unwrap();
//! assert_eq!(url, "http://example.org/paper.pdf");
//! ```

pub mod codec;
mod filename;
mod http;

pub use codec::{decode, DecodeError};
pub use filename::{normalize_download_dir, ordinal_width, pdf_file_name, sanitize_file_name};
pub use http::{
    extract_first_match, first_match, FetchError, HttpClient, HttpSettings, DEFAULT_USER_AGENT,
};
