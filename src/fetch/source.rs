use std::fmt;

use async_trait::async_trait;

/// Errors that can occur while fetching a site resource.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The resource does not exist (HTTP 404, missing file).
    NotFound(String),
    /// Transport-level failure (DNS, connection refused, reset).
    Network(String),
    /// Server answered with a non-success status.
    Status { status: u16, message: String },
    /// Local I/O failure other than a missing file.
    Io(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::NotFound(path) => write!(f, "resource not found: {path}"),
            FetchError::Network(msg) => write!(f, "network error: {msg}"),
            FetchError::Status { status, message } => {
                write!(f, "unexpected status (HTTP {status}): {message}")
            }
            FetchError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Loads site resources (the post index, article documents) as text.
///
/// Paths are site-relative, e.g. `data/posts.json` or `posts/hello.md`.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Returns the name of the source, for logging.
    fn name(&self) -> &str;

    async fn fetch_text(&self, path: &str) -> Result<String, FetchError>;
}

/// Strips a leading `/` so resource paths are always relative to the site root.
pub(crate) fn relative_path(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}
