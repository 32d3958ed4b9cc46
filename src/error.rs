use thiserror::Error;

pub type HtmlViewResult<T> = Result<T, HtmlViewError>;

/// Failure of a single stylesheet request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Asset '{url}' not found")]
    NotFound { url: String },

    #[error("Transport error fetching '{url}': {reason}")]
    Transport { url: String, reason: String },

    #[error("Asset loader stopped before '{url}' completed: {reason}")]
    Aborted { url: String, reason: String },
}

impl FetchError {
    /// The resolved URL the failed request was issued for
    pub fn url(&self) -> &str {
        match self {
            FetchError::NotFound { url }
            | FetchError::Transport { url, .. }
            | FetchError::Aborted { url, .. } => url,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum HtmlViewError {
    #[error("Stylesheet failed to load: {0}")]
    AssetLoad(FetchError),

    #[error("Asset path '{path}' rejected: {reason}")]
    AssetPathRejected { path: String, reason: String },

    #[error("No async runtime available to load document assets")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<FetchError> for HtmlViewError {
    fn from(err: FetchError) -> Self {
        HtmlViewError::AssetLoad(err)
    }
}

impl From<serde_yaml::Error> for HtmlViewError {
    fn from(err: serde_yaml::Error) -> Self {
        HtmlViewError::DeserializationError(err.to_string())
    }
}

impl From<serde_json::Error> for HtmlViewError {
    fn from(err: serde_json::Error) -> Self {
        HtmlViewError::DeserializationError(err.to_string())
    }
}

impl From<std::io::Error> for HtmlViewError {
    fn from(err: std::io::Error) -> Self {
        HtmlViewError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_model(path: &str) -> HtmlViewResult<String> {
        Ok(fs::read_to_string(path)?)
    }

    #[test]
    fn test_io_error_converts_through_question_mark() {
        let result = read_model("/nonexistent/results-html/model.yaml");
        assert!(matches!(result, Err(HtmlViewError::Io(_))));
    }

    #[test]
    fn test_fetch_error_becomes_asset_load() {
        let err: HtmlViewError = FetchError::NotFound {
            url: "module/a.css".to_string(),
        }
        .into();
        assert!(matches!(&err, HtmlViewError::AssetLoad(f) if f.url() == "module/a.css"));
        assert_eq!(
            err.to_string(),
            "Stylesheet failed to load: Asset 'module/a.css' not found"
        );
    }
}
