//! ScienceDirect (Elsevier) repository.
//!
//! Papers are addressed by their PII. The article page carries the PDF link
//! in a `pdfurl` attribute; papers outside the current subscription link to
//! the shopping cart instead.

use regex::Regex;

use super::{compile_pattern, PaperRepository, RepositoryError};

const SCIENCE_DIRECT_PAPER_PAGE_URL: &str = "http://www.sciencedirect.com/science/article/pii/{id}";

const SCIENCE_DIRECT_ACCESS_DENIED: &str = r"science\?_ob=ShoppingCartURL&_method=add&_eid=.*";

// e.g. http://www.sciencedirect.com/science/article/pii/S1084804515000284/pdfft?md5=82804e8d757f263cf037b084e044910d&pid=1-s2.0-S1084804515000284-main.pdf
const SCIENCE_DIRECT_PDF_URL: &str = r#"pdfurl="(https?://www\.sciencedirect\.com/science/article/pii/.{1,20}/pdf.*\?md5=.*&pid=.*-main\.pdf)" queryStr"#;

/// ScienceDirect repository
#[derive(Debug, Clone)]
pub struct ScienceDirectPaperRepository {
    access_denied: Regex,
    pdf_url: Regex,
}

impl ScienceDirectPaperRepository {
    pub fn new() -> Result<Self, RepositoryError> {
        Ok(Self {
            access_denied: compile_pattern("ScienceDirect", SCIENCE_DIRECT_ACCESS_DENIED)?,
            pdf_url: compile_pattern("ScienceDirect", SCIENCE_DIRECT_PDF_URL)?,
        })
    }
}

impl PaperRepository for ScienceDirectPaperRepository {
    fn name(&self) -> &str {
        "ScienceDirect"
    }

    fn page_url_template(&self) -> &str {
        SCIENCE_DIRECT_PAPER_PAGE_URL
    }

    fn access_denied_pattern(&self) -> &Regex {
        &self.access_denied
    }

    fn pdf_url_pattern(&self) -> &Regex {
        &self.pdf_url
    }
}
