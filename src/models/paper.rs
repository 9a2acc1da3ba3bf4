//! Paper model: one BibTeX entry being resolved against a repository.

use biblatex::{Chunk, Entry, Spanned};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::models::bibtex::{field_of, BibDatabase, BibError, FILE_FIELD};
use crate::repository::PaperRepository;
use crate::utils::codec::{self, DecodeError};
use crate::utils::{first_match, pdf_file_name, FetchError, HttpClient};

/// Where a paper is in its resolution
///
/// `Denied`, `NotFound`, `Downloaded` and `DownloadFailed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperState {
    Created,
    PageFetched,
    Allowed,
    Denied,
    Found,
    NotFound,
    Downloaded,
    DownloadFailed,
}

/// Why a paper cannot be downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    /// The landing page asks to sign in or purchase
    AccessDenied,
    /// The landing page has no recognizable PDF link
    PdfUrlNotFound,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::AccessDenied => write!(f, "access denied"),
            Unavailable::PdfUrlNotFound => write!(f, "PDF URL not found"),
        }
    }
}

/// Errors that stop the download of a single paper
#[derive(Error, Debug)]
pub enum PaperError {
    #[error("The paper isn't available for you ({reason}). Maybe you don't have access to it using the current network or account. URL: {url}")]
    NotAvailable { url: String, reason: Unavailable },

    #[error("It wasn't possible to get the paper page: {0}")]
    Fetch(#[source] FetchError),

    #[error("Download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl PaperError {
    /// Check if the paper is simply not downloadable from the repository
    pub fn is_not_available(&self) -> bool {
        matches!(self, PaperError::NotAvailable { .. })
    }
}

/// A BibTeX entry together with what has been resolved about it so far.
///
/// The paper copies the raw fields it needs and refers to its entry by
/// citation key, so the database stays free to be mutated while papers exist.
#[derive(Debug, Clone)]
pub struct Paper<'r> {
    repository: &'r dyn PaperRepository,
    id: String,
    ordinal: usize,
    title: Option<Vec<Spanned<Chunk>>>,
    year: Option<Vec<Spanned<Chunk>>>,
    doi: Option<Vec<Spanned<Chunk>>>,
    page_url: String,
    state: PaperState,
    pdf_url: Option<String>,
    local_path: Option<String>,
}

impl<'r> Paper<'r> {
    /// Create the paper for `entry`, the `ordinal`-th entry (1-based) of the
    /// file, to be downloaded from `repository`.
    pub fn from_entry(repository: &'r dyn PaperRepository, entry: &Entry, ordinal: usize) -> Self {
        let raw = |field: &str| field_of(entry, field).map(|chunks| chunks.to_vec());
        Self {
            repository,
            page_url: repository.paper_page_url(&entry.key),
            id: entry.key.clone(),
            ordinal,
            title: raw("title"),
            year: raw("year"),
            doi: raw("doi"),
            state: PaperState::Created,
            pdf_url: None,
            local_path: None,
        }
    }

    /// Citation key
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based position inside the BibTeX file
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn title(&self) -> Result<String, DecodeError> {
        codec::decode("title", self.title.as_deref())
    }

    pub fn year(&self) -> Result<String, DecodeError> {
        codec::decode("year", self.year.as_deref())
    }

    pub fn doi(&self) -> Result<String, DecodeError> {
        codec::decode("doi", self.doi.as_deref())
    }

    /// Landing page URL on the repository
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn state(&self) -> PaperState {
        self.state
    }

    /// PDF URL, once extracted from the landing page
    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref()
    }

    /// Local PDF path, once downloaded
    pub fn local_path(&self) -> Option<&str> {
        self.local_path.as_deref()
    }

    /// Fetch the landing page of the paper
    pub async fn fetch_page(&mut self, client: &HttpClient) -> Result<String, PaperError> {
        let html = client
            .fetch_page(&self.page_url)
            .await
            .map_err(PaperError::Fetch)?;
        self.state = PaperState::PageFetched;
        Ok(html)
    }

    /// Look for the repository's access denied marker in the landing page
    pub fn check_access(&mut self, html: &str) -> Result<(), PaperError> {
        if first_match(self.repository.access_denied_pattern(), html).is_empty() {
            self.state = PaperState::Allowed;
            Ok(())
        } else {
            self.state = PaperState::Denied;
            Err(self.not_available(Unavailable::AccessDenied))
        }
    }

    /// Extract the PDF URL from the landing page
    pub fn extract_pdf_url(&mut self, html: &str) -> Result<String, PaperError> {
        let url = first_match(self.repository.pdf_url_pattern(), html);
        if url.trim().is_empty() {
            self.state = PaperState::NotFound;
            return Err(self.not_available(Unavailable::PdfUrlNotFound));
        }

        self.state = PaperState::Found;
        self.pdf_url = Some(url.clone());
        Ok(url)
    }

    /// Fetch the landing page once, check access and extract the PDF URL
    pub async fn resolve_pdf_url(&mut self, client: &HttpClient) -> Result<String, PaperError> {
        let html = self.fetch_page(client).await?;
        self.check_access(&html)?;
        self.extract_pdf_url(&html)
    }

    /// Resolve and download the PDF into `download_dir`, returning the local
    /// path. `total` is the number of entries of the run and sets the width of
    /// the ordinal in the file name.
    pub async fn download(
        &mut self,
        client: &HttpClient,
        download_dir: &str,
        total: usize,
    ) -> Result<String, PaperError> {
        let title = self.title()?;
        let pdf_url = self.resolve_pdf_url(client).await?;
        let path = pdf_file_name(download_dir, self.ordinal, total, &title);

        match client.download_to_file(&pdf_url, Path::new(&path)).await {
            Ok(_) => {
                self.state = PaperState::Downloaded;
                self.local_path = Some(path.clone());
                Ok(path)
            }
            Err(source) => {
                self.state = PaperState::DownloadFailed;
                Err(PaperError::Download {
                    url: pdf_url,
                    source,
                })
            }
        }
    }

    /// Write the local path into the `file` field of the paper's entry.
    ///
    /// Returns false without touching the database if nothing was downloaded.
    pub fn record_local_path(&self, database: &mut BibDatabase) -> Result<bool, BibError> {
        let Some(path) = self.local_path.as_deref() else {
            return Ok(false);
        };
        database.set_field(&self.id, FILE_FIELD, path)?;
        Ok(true)
    }

    fn not_available(&self, reason: Unavailable) -> PaperError {
        PaperError::NotAvailable {
            url: self.page_url.clone(),
            reason,
        }
    }
}

impl fmt::Display for Paper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: Result<String, DecodeError>, raw: &Option<Vec<Spanned<Chunk>>>| {
            value.unwrap_or_else(|_| raw.as_deref().map(codec::to_user_string).unwrap_or_default())
        };
        write!(
            f,
            "{} - PaperID: {} | Title: {} | Year: {} | DOI: {}",
            self.ordinal,
            self.id,
            show(self.title(), &self.title),
            show(self.year(), &self.year),
            show(self.doi(), &self.doi)
        )
    }
}
