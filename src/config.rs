use serde::{Deserialize, Serialize};

use crate::error::{HtmlViewError, HtmlViewResult};

/// Naming conventions shared between the view and its host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfig {
    /// Prefix every stylesheet and script path is resolved against
    pub asset_base: String,
    /// Class carried by every head element the view injects
    pub asset_class: String,
    /// Class of the container holding the rendered document
    pub content_class: String,
    /// Class added to the view's root element
    pub root_class: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            asset_base: "module/".to_string(),
            asset_class: "module-asset".to_string(),
            content_class: "content".to_string(),
            root_class: "jmv-results-html".to_string(),
        }
    }
}

impl ViewConfig {
    /// Parse a config from YAML. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> HtmlViewResult<Self> {
        let config: ViewConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HtmlViewResult<()> {
        for (key, value) in [
            ("assetClass", &self.asset_class),
            ("contentClass", &self.content_class),
            ("rootClass", &self.root_class),
        ] {
            if value.is_empty() || value.contains(char::is_whitespace) {
                return Err(HtmlViewError::Config(format!(
                    "'{}' must be a single non-empty class token, got '{}'",
                    key, value
                )));
            }
        }
        Ok(())
    }

    /// Resolve a document-relative asset path against `asset_base`.
    pub fn resolve_asset_url(&self, path: &str) -> String {
        if self.asset_base.is_empty() || self.asset_base.ends_with('/') {
            format!("{}{}", self.asset_base, path)
        } else {
            format!("{}/{}", self.asset_base, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewConfig::default();
        assert_eq!(config.asset_base, "module/");
        assert_eq!(config.asset_class, "module-asset");
        assert_eq!(config.content_class, "content");
    }

    #[test]
    fn test_yaml_partial_override() {
        let config = ViewConfig::from_yaml_str("assetBase: /static/modules\n").unwrap();
        assert_eq!(config.asset_base, "/static/modules");
        assert_eq!(config.asset_class, "module-asset");
        assert_eq!(
            config.resolve_asset_url("css/table.css"),
            "/static/modules/css/table.css"
        );
    }

    #[test]
    fn test_resolve_with_trailing_slash() {
        let config = ViewConfig::default();
        assert_eq!(config.resolve_asset_url("style.css"), "module/style.css");
    }

    #[test]
    fn test_rejects_multi_token_class() {
        let result = ViewConfig::from_yaml_str("contentClass: \"a b\"\n");
        assert!(matches!(result, Err(HtmlViewError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let result = ViewConfig::from_yaml_str("assetBase: [unclosed");
        assert!(matches!(result, Err(HtmlViewError::DeserializationError(_))));
    }
}
