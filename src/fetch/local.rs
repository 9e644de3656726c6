//! Local directory source, for previewing a site build before deploying it.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use log::debug;

use super::source::{FetchError, ResourceFetcher, relative_path};

pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, path: &str) -> PathBuf {
        self.root.join(relative_path(path))
    }
}

#[async_trait]
impl ResourceFetcher for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch_text(&self, path: &str) -> Result<String, FetchError> {
        let full = self.path_for(path);
        debug!("read {}", full.display());
        tokio::fs::read_to_string(&full).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(path.to_string()),
            _ => FetchError::Io(format!("{}: {}", full.display(), e)),
        })
    }
}
