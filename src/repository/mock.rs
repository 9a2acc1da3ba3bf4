//! Mock repository for testing purposes.

use regex::Regex;

use super::{compile_pattern, PaperRepository, RepositoryError, PAPER_ID_PLACEHOLDER};

/// Marker the mock repository treats as "access denied"
pub const MOCK_ACCESS_DENIED: &str = "ACCESS DENIED";

/// Pattern the mock repository uses to find the PDF link
pub const MOCK_PDF_URL: &str = r#"<a class="pdf" href="([^"]+)">"#;

/// A repository whose landing pages live under `<base_url>/paper/<id>`,
/// typically a local mock HTTP server.
#[derive(Debug, Clone)]
pub struct MockPaperRepository {
    page_url_template: String,
    access_denied: Regex,
    pdf_url: Regex,
}

impl MockPaperRepository {
    /// Create a mock repository with the default patterns
    pub fn new(base_url: &str) -> Result<Self, RepositoryError> {
        Self::with_patterns(base_url, MOCK_ACCESS_DENIED, MOCK_PDF_URL)
    }

    /// Create a mock repository with custom patterns
    pub fn with_patterns(
        base_url: &str,
        access_denied: &str,
        pdf_url: &str,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            page_url_template: format!(
                "{}/paper/{}",
                base_url.trim_end_matches('/'),
                PAPER_ID_PLACEHOLDER
            ),
            access_denied: compile_pattern("Mock", access_denied)?,
            pdf_url: compile_pattern("Mock", pdf_url)?,
        })
    }
}

impl PaperRepository for MockPaperRepository {
    fn name(&self) -> &str {
        "Mock"
    }

    fn page_url_template(&self) -> &str {
        &self.page_url_template
    }

    fn access_denied_pattern(&self) -> &Regex {
        &self.access_denied
    }

    fn pdf_url_pattern(&self) -> &Regex {
        &self.pdf_url
    }
}

/// Landing page served for a paper whose PDF lives at `pdf_url`
pub fn landing_page(pdf_url: &str) -> String {
    format!(
        r#"<html><body><h1>Paper</h1><a class="pdf" href="{}">Full text</a></body></html>"#,
        pdf_url
    )
}

/// Landing page served for a paper the user has no access to
pub fn denied_page(pdf_url: &str) -> String {
    format!(
        r#"<html><body><p>{}</p><a class="pdf" href="{}">Buy</a></body></html>"#,
        MOCK_ACCESS_DENIED, pdf_url
    )
}
