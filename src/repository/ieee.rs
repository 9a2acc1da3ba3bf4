//! IEEE Xplore repository.
//!
//! Papers are addressed by their article number, which is also the citation
//! key IEEE Xplore uses when exporting BibTeX. The stamp page embeds the PDF
//! viewer in a frame whose `src` is the PDF URL.

use regex::Regex;

use super::{compile_pattern, PaperRepository, RepositoryError};

const IEEE_PAPER_PAGE_URL: &str = "http://ieeexplore.ieee.org/stamp/stamp.jsp?tp=&arnumber={id}";

const IEEE_ACCESS_DENIED: &str =
    r#"<a tabindex="0" class="pdf">Full Text <b>Sign-In or Purchase</b></a>"#;

const IEEE_PDF_URL: &str =
    r#"<frame src="(https?://ieeexplore\.ieee\.org/.*\.pdf.*arnumber=.*)" frameborder="#;

/// IEEE Xplore repository
#[derive(Debug, Clone)]
pub struct IeeePaperRepository {
    access_denied: Regex,
    pdf_url: Regex,
}

impl IeeePaperRepository {
    pub fn new() -> Result<Self, RepositoryError> {
        Ok(Self {
            access_denied: compile_pattern("IEEE", IEEE_ACCESS_DENIED)?,
            pdf_url: compile_pattern("IEEE", IEEE_PDF_URL)?,
        })
    }
}

impl PaperRepository for IeeePaperRepository {
    fn name(&self) -> &str {
        "IEEE"
    }

    fn page_url_template(&self) -> &str {
        IEEE_PAPER_PAGE_URL
    }

    fn access_denied_pattern(&self) -> &Regex {
        &self.access_denied
    }

    fn pdf_url_pattern(&self) -> &Regex {
        &self.pdf_url
    }
}
