use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::error::FetchError;

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'static>>;

/// Retrieves the raw text of a module asset.
///
/// Implementations get the already-resolved URL (base path included). No
/// caching or retry is expected from them.
pub trait AssetFetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> FetchFuture;
}

impl<T: AssetFetcher + ?Sized> AssetFetcher for Arc<T> {
    fn fetch_text(&self, url: &str) -> FetchFuture {
        (**self).fetch_text(url)
    }
}

/// Serves assets from a static directory, mapping URLs to relative paths
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetFetcher for DirFetcher {
    fn fetch_text(&self, url: &str) -> FetchFuture {
        let path = self.root.join(url.trim_start_matches('/'));
        let url = url.to_string();
        Box::pin(async move {
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => FetchError::NotFound { url },
                    _ => FetchError::Transport {
                        url,
                        reason: e.to_string(),
                    },
                })
        })
    }
}
