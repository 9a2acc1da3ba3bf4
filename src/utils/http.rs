//! HTTP client utilities.
//!
//! One [`HttpClient`] is built per run. It owns the cookie jar, so a cookie set
//! by a landing page is sent back when the PDF itself is requested from the
//! same host.

use regex::Regex;
use reqwest::header::HOST;
use reqwest::{Client, Response, StatusCode, Url};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Browser user agent sent with every request. Some publishers refuse to serve
/// landing pages to unknown agents.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 5.1; rv:31.0) Gecko/20100101 Firefox/31.0";

/// Errors raised while fetching pages or downloading files
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: StatusCode },

    #[error("Could not write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Settings for the shared HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared HTTP client with a run-scoped cookie jar
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with an accept-all cookie store
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .cookie_store(true)
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch a page and return its whole body as text
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    /// Stream the body of `url` into a newly created file at `path`.
    ///
    /// Returns the number of bytes written. On failure the partially written
    /// file is left in place.
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let io_error = |source| FetchError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut response = self.get(url).await?;
        let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?
        {
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_error)?;

        debug!(url, path = %path.display(), bytes = written, "Download finished");
        Ok(written)
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let host = host_header(&parsed).ok_or_else(|| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?;

        debug!(url, "GET");
        let response = self
            .client
            .get(parsed)
            .header(HOST, host)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

/// Value of the `Host` header for a URL; the port is only included when it
/// is not the default one for the scheme.
fn host_header(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Compile `pattern` and return the first piece of `text` it matches.
///
/// See [`first_match`] for what is returned.
pub fn extract_first_match(text: &str, pattern: &str) -> Result<String, FetchError> {
    let regex = Regex::new(pattern).map_err(|source| FetchError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(first_match(&regex, text))
}

/// Search `text` once with `regex`.
///
/// If the pattern has a capturing group the content of the first group is
/// returned, otherwise the whole match. No match yields an empty string, which
/// callers treat as "information absent".
pub fn first_match(regex: &Regex, text: &str) -> String {
    let Some(captures) = regex.captures(text) else {
        return String::new();
    };

    let group = if regex.captures_len() > 1 { 1 } else { 0 };
    captures
        .get(group)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn client() -> HttpClient {
        HttpClient::new(&HttpSettings::default()).unwrap()
    }

    #[test]
    fn test_first_match_whole_match_without_group() {
        assert_eq!(
            extract_first_match("price: 42 dollars", r"\d+").unwrap(),
            "42"
        );
    }

    #[test]
    fn test_first_match_returns_first_group() {
        let html = r#"<frame src="http://example.org/doc.pdf" frameborder="0">"#;
        assert_eq!(
            extract_first_match(html, r#"<frame src="([^"]+)""#).unwrap(),
            "http://example.org/doc.pdf"
        );
    }

    #[test]
    fn test_first_match_absent_is_empty() {
        assert_eq!(extract_first_match("nothing here", r"pdfurl=(\S+)").unwrap(), "");
    }

    #[test]
    fn test_first_match_optional_group_not_taken() {
        assert_eq!(extract_first_match("abc", r"a(x)?bc").unwrap(), "");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = extract_first_match("text", r"(unclosed").unwrap_err();
        assert!(matches!(err, FetchError::Pattern { .. }));
    }

    #[test]
    fn test_host_header() {
        let url = Url::parse("http://ieeexplore.ieee.org/stamp/stamp.jsp").unwrap();
        assert_eq!(host_header(&url).unwrap(), "ieeexplore.ieee.org");

        let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(host_header(&url).unwrap(), "127.0.0.1:8080");

        let url = Url::parse("https://example.org:443/").unwrap();
        assert_eq!(host_header(&url).unwrap(), "example.org");
    }

    #[tokio::test]
    async fn test_fetch_page_sends_headers() {
        let mut server = mockito::Server::new_async().await;
        let host = server.host_with_port();
        let mock = server
            .mock("GET", "/paper")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .match_header("host", host.as_str())
            .with_status(200)
            .with_body("<html>landing</html>")
            .create_async()
            .await;

        let body = client()
            .fetch_page(&format!("{}/paper", server.url()))
            .await
            .unwrap();

        assert_eq!(body, "<html>landing</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/missing", server.url());
        let err = client().fetch_page(&url).await.unwrap_err();
        match err {
            FetchError::Status { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status, StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_page_invalid_url() {
        let err = client().fetch_page("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { ref url, .. } if url == "not a url"));
    }

    #[tokio::test]
    async fn test_fetch_page_transport_error() {
        // Port 9 (discard) is closed on test machines
        let err = client()
            .fetch_page("http://127.0.0.1:9/paper")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(err.to_string().contains("http://127.0.0.1:9/paper"));
    }

    #[tokio::test]
    async fn test_download_to_file() {
        let mut server = mockito::Server::new_async().await;
        let payload = vec![0x25u8; 10_000];
        let _mock = server
            .mock("GET", "/file.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body(payload.clone())
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("1-Paper.pdf");
        let written = client()
            .download_to_file(&format!("{}/file.pdf", server.url()), &path)
            .await
            .unwrap();

        assert_eq!(written, payload.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_download_to_missing_directory_fails() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/file.pdf")
            .with_status(200)
            .with_body("%PDF")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("1-Paper.pdf");
        let err = client()
            .download_to_file(&format!("{}/file.pdf", server.url()), &path)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn test_cookies_shared_between_requests() {
        let mut server = mockito::Server::new_async().await;
        let _landing = server
            .mock("GET", "/landing")
            .with_status(200)
            .with_header("set-cookie", "access=granted; Path=/")
            .with_body("landing")
            .create_async()
            .await;
        let file = server
            .mock("GET", "/file.pdf")
            .match_header("cookie", "access=granted")
            .with_status(200)
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let client = client();
        client
            .fetch_page(&format!("{}/landing", server.url()))
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        client
            .download_to_file(&format!("{}/file.pdf", server.url()), &path)
            .await
            .unwrap();

        file.assert_async().await;
    }
}
