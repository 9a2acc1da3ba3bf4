use anyhow::{Context, Result};
use bibtex_paper_downloader::config::{find_config_file, load_settings, RunConfig, Settings};
use bibtex_paper_downloader::{Downloader, RepositoryRegistry};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// BibTeX Paper Downloader - Download the papers of a BibTeX file and record where they were saved
#[derive(Parser, Debug)]
#[command(name = "bibtex-papers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download the papers of a BibTeX file from a publisher repository", long_about = None)]
struct Cli {
    /// BibTeX file listing the papers. It is rewritten with the local PDF paths
    #[arg(required_unless_present = "list_repositories")]
    bib_file: Option<PathBuf>,

    /// Directory where the PDFs are saved (default: system temp directory)
    download_dir: Option<PathBuf>,

    /// Repository the papers are downloaded from (default: IEEE)
    repository: Option<String>,

    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Save the BibTeX file after every downloaded paper
    #[arg(long)]
    checkpoint: bool,

    /// List the available repositories and exit
    #[arg(long)]
    list_repositories: bool,
}

impl Cli {
    /// Merge the command line over the loaded settings
    fn run_config(&self, mut settings: Settings) -> Result<RunConfig> {
        let bib_file = self
            .bib_file
            .clone()
            .context("The BibTeX file must be given")?;

        if let Some(dir) = &self.download_dir {
            settings.download_dir = Some(dir.clone());
        }
        if let Some(repository) = &self.repository {
            settings.repository = repository.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        settings.checkpoint |= self.checkpoint;

        Ok(settings.into_run_config(bib_file))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                format!(
                    "bibtex_paper_downloader={0},bibtex_papers={0}",
                    env_filter
                )
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = RepositoryRegistry::new();

    if cli.list_repositories {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let settings = load_settings(config_path.as_deref())
        .context("It was not possible to load the configuration")?;

    let config = cli.run_config(settings)?;
    let mut downloader = Downloader::with_registry(config, &registry)?;
    let summary = downloader.run().await?;

    if !cli.quiet {
        println!("{}", summary);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::MAIN_SEPARATOR;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_positional_arguments() {
        let cli = Cli::parse_from(["bibtex-papers", "refs.bib"]);
        assert_eq!(cli.bib_file, Some(PathBuf::from("refs.bib")));
        assert!(cli.download_dir.is_none());
        assert!(cli.repository.is_none());

        let cli = Cli::parse_from(["bibtex-papers", "refs.bib", "/data/papers", "ScienceDirect"]);
        assert_eq!(cli.download_dir, Some(PathBuf::from("/data/papers")));
        assert_eq!(cli.repository.as_deref(), Some("ScienceDirect"));
    }

    #[test]
    fn test_cli_requires_bib_file() {
        assert!(Cli::try_parse_from(["bibtex-papers"]).is_err());

        let cli = Cli::try_parse_from(["bibtex-papers", "--list-repositories"]).unwrap();
        assert!(cli.list_repositories);
        assert!(cli.bib_file.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["bibtex-papers", "refs.bib", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["bibtex-papers", "refs.bib", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["bibtex-papers", "refs.bib", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "bibtex-papers",
            "refs.bib",
            "--timeout",
            "60",
            "--checkpoint",
            "--config",
            "/path/to/config.toml",
        ]);
        assert_eq!(cli.timeout, Some(60));
        assert!(cli.checkpoint);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_overrides_settings() {
        let settings = Settings {
            repository: "ScienceDirect".to_string(),
            download_dir: Some(PathBuf::from("/from/settings")),
            ..Settings::default()
        };

        let cli = Cli::parse_from(["bibtex-papers", "refs.bib", "/from/cli", "IEEE", "--timeout", "5"]);
        let config = cli.run_config(settings.clone()).unwrap();
        assert_eq!(config.bib_file, PathBuf::from("refs.bib"));
        assert_eq!(config.download_dir, format!("/from/cli{}", MAIN_SEPARATOR));
        assert_eq!(config.repository, "IEEE");
        assert_eq!(config.http.timeout.as_secs(), 5);
        assert!(!config.checkpoint);

        let cli = Cli::parse_from(["bibtex-papers", "refs.bib"]);
        let config = cli.run_config(settings).unwrap();
        assert_eq!(config.download_dir, format!("/from/settings{}", MAIN_SEPARATOR));
        assert_eq!(config.repository, "ScienceDirect");
    }
}
