use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HtmlViewResult;

/// Pre-generated HTML payload plus the module assets it depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlDocument {
    /// HTML fragment; empty means there is nothing to render
    pub content: String,
    /// Stylesheet paths relative to the module asset base
    pub stylesheets: Vec<String>,
    /// Script paths relative to the module asset base
    pub scripts: Vec<String>,
}

impl HtmlDocument {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_stylesheet(mut self, path: impl Into<String>) -> Self {
        self.stylesheets.push(path.into());
        self
    }

    pub fn with_script(mut self, path: impl Into<String>) -> Self {
        self.scripts.push(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    #[default]
    Complete,
    Running,
    Error,
}

/// Result model backing an HTML view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlModel {
    pub name: String,
    /// Label used for the accordion header
    pub title: String,
    pub element: HtmlDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: ResultStatus,
    pub stale: bool,
    pub options: Map<String, Value>,
}

impl Default for HtmlModel {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            title: "(no title)".to_string(),
            element: HtmlDocument::default(),
            error: None,
            status: ResultStatus::Complete,
            stale: false,
            options: Map::new(),
        }
    }
}

impl HtmlModel {
    pub fn new(title: impl Into<String>, element: HtmlDocument) -> Self {
        Self {
            title: title.into(),
            element,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> HtmlViewResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> HtmlViewResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_defaults() {
        let model = HtmlModel::default();
        assert_eq!(model.title, "(no title)");
        assert_eq!(model.name, "name");
        assert_eq!(model.status, ResultStatus::Complete);
        assert!(!model.stale);
        assert!(model.element.is_empty());
        assert!(model.options.is_empty());
    }

    #[test]
    fn test_model_from_yaml_fills_missing_fields() {
        let yaml = r#"
title: Descriptives
element:
  content: "<p>n = 20</p>"
  stylesheets: [descriptives.css]
"#;
        let model = HtmlModel::from_yaml_str(yaml).unwrap();
        assert_eq!(model.title, "Descriptives");
        assert_eq!(model.name, "name");
        assert_eq!(model.element.content, "<p>n = 20</p>");
        assert_eq!(model.element.stylesheets, vec!["descriptives.css"]);
        assert!(model.element.scripts.is_empty());
    }

    #[test]
    fn test_model_from_json_with_options() {
        let json = r#"{"title":"T","status":"running","options":{"digits":3}}"#;
        let model = HtmlModel::from_json_str(json).unwrap();
        assert_eq!(model.status, ResultStatus::Running);
        assert_eq!(model.options.get("digits"), Some(&Value::from(3)));
        assert_eq!(model.element, HtmlDocument::default());
    }

    #[test]
    fn test_document_builder() {
        let doc = HtmlDocument::new("<p>x</p>")
            .with_stylesheet("a.css")
            .with_script("b.js");
        assert_eq!(doc.stylesheets, vec!["a.css"]);
        assert_eq!(doc.scripts, vec!["b.js"]);
        assert!(!doc.is_empty());
    }
}
