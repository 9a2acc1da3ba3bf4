//! Configuration management.
//!
//! Settings come from an optional TOML file layered with environment
//! variables prefixed `BIBTEX_PAPERS_`, then command line arguments override
//! them. The result is one immutable [`RunConfig`] per run.
//!
//! # Configuration File Format
//!
//! ```toml
//! repository = "IEEE"
//! download_dir = "/home/me/papers"
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! checkpoint = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{normalize_download_dir, HttpSettings, DEFAULT_USER_AGENT};

/// Environment variable prefix for settings overrides
pub const ENV_PREFIX: &str = "BIBTEX_PAPERS";

/// Settings file looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "bibtex-papers.toml";

/// Repository used when none is given
pub const DEFAULT_REPOSITORY: &str = "IEEE";

/// Settings loaded from the config file and the environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Repository the papers are downloaded from
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Directory the PDFs are written to (default: system temp dir)
    #[serde(default)]
    pub download_dir: Option<PathBuf>,

    /// Whole request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Save the BibTeX file after every successful download
    #[serde(default)]
    pub checkpoint: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            download_dir: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
            checkpoint: false,
        }
    }
}

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Settings {
    /// HTTP client settings
    pub fn http(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// Build the run configuration for `bib_file` from these settings
    pub fn into_run_config(self, bib_file: impl Into<PathBuf>) -> RunConfig {
        let http = self.http();
        let download_dir = self.download_dir.unwrap_or_else(std::env::temp_dir);
        RunConfig {
            bib_file: bib_file.into(),
            download_dir: normalize_download_dir(&download_dir.to_string_lossy()),
            repository: self.repository,
            checkpoint: self.checkpoint,
            http,
        }
    }
}

/// Immutable configuration of one download run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// BibTeX file read and rewritten by the run
    pub bib_file: PathBuf,

    /// Destination directory, always ending with a path separator
    pub download_dir: String,

    /// Repository name, with or without the `PaperRepository` suffix
    pub repository: String,

    pub checkpoint: bool,

    pub http: HttpSettings,
}

impl RunConfig {
    /// Configuration with default settings for `bib_file`
    pub fn new(bib_file: impl Into<PathBuf>) -> Self {
        Settings::default().into_run_config(bib_file)
    }

    pub fn with_download_dir(mut self, download_dir: impl AsRef<Path>) -> Self {
        self.download_dir = normalize_download_dir(&download_dir.as_ref().to_string_lossy());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: bool) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }
}

/// Load settings from an optional file and the environment
pub fn load_settings(path: Option<&Path>) -> Result<Settings, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()?;

    settings.try_deserialize()
}

/// Find a settings file in the default locations
///
/// Searched in order: `./bibtex-papers.toml`, then
/// `<config dir>/bibtex-papers/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bibtex-papers").join("config.toml"))
        .filter(|path| path.is_file())
}
