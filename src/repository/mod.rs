//! Paper repository plugins.
//!
//! A repository is a publisher site hosting papers (IEEE Xplore, ScienceDirect,
//! ...). Every repository knows three things about its site:
//!
//! - how to build the landing page URL of a paper from its citation key,
//! - how to recognize a landing page that refuses access to the full text,
//! - how to find the URL of the PDF inside a landing page.
//!
//! New repositories are added by implementing [`PaperRepository`] and
//! registering a constructor with the [`RepositoryRegistry`]. The download
//! orchestrator only ever sees the trait.
//!
//! # Implementing a New Repository
//!
//! 1. Create a struct holding the compiled patterns of the site
//! 2. Implement `name`, `page_url_template` and the two pattern getters
//! 3. Add a constructor to `RepositoryRegistry::new()` or register it at runtime

mod ieee;
pub mod mock;
mod registry;
mod science_direct;

pub use ieee::IeeePaperRepository;
pub use mock::MockPaperRepository;
pub use registry::{RepositoryConstructor, RepositoryRegistry, REPOSITORY_SUFFIX};
pub use science_direct::ScienceDirectPaperRepository;

use regex::Regex;

/// Placeholder replaced by the citation key in a landing page URL template
pub const PAPER_ID_PLACEHOLDER: &str = "{id}";

/// Interface implemented by every paper repository.
///
/// Implementations hold no per-paper state: the same instance serves every
/// entry of a run.
pub trait PaperRepository: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this repository
    fn name(&self) -> &str;

    /// Landing page URL with [`PAPER_ID_PLACEHOLDER`] where the citation key goes
    fn page_url_template(&self) -> &str;

    /// Pattern matching a marker that the paper cannot be downloaded with the
    /// current network or account (sign-in or purchase required)
    fn access_denied_pattern(&self) -> &Regex;

    /// Pattern extracting the PDF URL from a landing page. The first capturing
    /// group, if any, is the URL.
    fn pdf_url_pattern(&self) -> &Regex;

    /// Landing page URL of a paper
    fn paper_page_url(&self, paper_id: &str) -> String {
        self.page_url_template()
            .replace(PAPER_ID_PLACEHOLDER, &urlencoding::encode(paper_id))
    }
}

/// Errors raised while resolving a repository by name
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No repository is registered under the name
    #[error("The repository named {0} is not supported or does not exist")]
    Unsupported(String),

    /// The repository exists but could not be constructed
    #[error("Error trying to create repository {name}: {reason}")]
    Instantiation { name: String, reason: String },
}

/// Compile a repository pattern, reporting failures as an instantiation error
pub(crate) fn compile_pattern(repository: &str, pattern: &str) -> Result<Regex, RepositoryError> {
    Regex::new(pattern).map_err(|e| RepositoryError::Instantiation {
        name: repository.to_string(),
        reason: format!("invalid pattern {}: {}", pattern, e),
    })
}
