//! Download orchestrator.
//!
//! Walks the BibTeX entries in file order, drives one [`Paper`] per entry
//! through resolution and download, and writes the updated database back to
//! the original file.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::models::{BibDatabase, BibError, Paper, PaperError};
use crate::repository::{PaperRepository, RepositoryError, RepositoryRegistry};
use crate::utils::{FetchError, HttpClient};

/// Errors that abort a whole run
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Bib(#[from] BibError),

    #[error(transparent)]
    Http(#[from] FetchError),
}

/// Outcome counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub downloaded: usize,
    /// Denied or no PDF link on the landing page
    pub unavailable: usize,
    /// Transport, decode or file errors
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} unavailable, {} failed, {} total",
            self.downloaded, self.unavailable, self.failed, self.total
        )
    }
}

/// Downloads the papers of one BibTeX file from one repository
#[derive(Debug)]
pub struct Downloader {
    config: RunConfig,
    repository: Box<dyn PaperRepository>,
    client: HttpClient,
    database: BibDatabase,
}

impl Downloader {
    /// Create a downloader using the built-in repositories
    pub fn new(config: RunConfig) -> Result<Self, DownloadError> {
        Self::with_registry(config, &RepositoryRegistry::new())
    }

    /// Create a downloader resolving the repository from `registry`.
    ///
    /// The repository is resolved before the BibTeX file is read or any
    /// request is made.
    pub fn with_registry(
        config: RunConfig,
        registry: &RepositoryRegistry,
    ) -> Result<Self, DownloadError> {
        let repository = registry.resolve(&config.repository)?;
        Self::with_repository(config, repository)
    }

    /// Create a downloader for an already built repository
    pub fn with_repository(
        config: RunConfig,
        repository: Box<dyn PaperRepository>,
    ) -> Result<Self, DownloadError> {
        let database = BibDatabase::load(&config.bib_file)?;
        let client = HttpClient::new(&config.http)?;
        Ok(Self {
            config,
            repository,
            client,
            database,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn repository(&self) -> &dyn PaperRepository {
        self.repository.as_ref()
    }

    /// The database, including the `file` fields set so far
    pub fn database(&self) -> &BibDatabase {
        &self.database
    }

    /// Download every paper and save the BibTeX file.
    ///
    /// A paper that cannot be downloaded is logged and skipped. Only errors
    /// writing the BibTeX file abort the run.
    pub async fn run(&mut self) -> Result<RunSummary, DownloadError> {
        let total = self.database.len();
        info!(
            "{} papers found. Starting download from {} to {} using BibTeX file {}",
            total,
            self.repository.name(),
            self.config.download_dir,
            self.config.bib_file.display()
        );

        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };

        for (index, key) in self.database.keys().into_iter().enumerate() {
            let Some(entry) = self.database.entry(&key) else {
                continue;
            };
            let mut paper = Paper::from_entry(self.repository.as_ref(), entry, index + 1);
            info!("{}", paper);

            match paper
                .download(&self.client, &self.config.download_dir, total)
                .await
            {
                Ok(path) => {
                    info!("Paper downloaded to {}", path);
                    paper.record_local_path(&mut self.database)?;
                    summary.downloaded += 1;
                    if self.config.checkpoint {
                        self.save()?;
                    }
                }
                Err(e) if e.is_not_available() => {
                    info!("{}", e);
                    summary.unavailable += 1;
                }
                Err(e) => {
                    if let PaperError::Download { .. } = e {
                        warn!(paper = paper.id(), "A partial file may have been left behind");
                    }
                    info!("{}", e);
                    summary.failed += 1;
                }
            }
            debug!(paper = paper.id(), state = ?paper.state(), "Paper processed");
        }

        self.save()?;
        info!(
            "BibTeX file {} successfully updated",
            self.config.bib_file.display()
        );
        Ok(summary)
    }

    fn save(&self) -> Result<(), BibError> {
        self.database.save(&self.config.bib_file)
    }
}
