use crate::document::HtmlDocument;
use crate::error::{HtmlViewError, HtmlViewResult};
use regex::Regex;
use std::sync::OnceLock;

fn scheme_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap())
}

/// Validate every asset path a document declares
pub fn validate_document(doc: &HtmlDocument) -> HtmlViewResult<()> {
    for path in doc.stylesheets.iter().chain(doc.scripts.iter()) {
        validate_asset_path(path)?;
    }
    Ok(())
}

/// Asset paths are resolved against the module base, so they must stay
/// relative and inside it.
pub fn validate_asset_path(path: &str) -> HtmlViewResult<()> {
    let reject = |reason: &str| {
        Err(HtmlViewError::AssetPathRejected {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.trim().is_empty() {
        return reject("path is empty");
    }
    if path.starts_with('/') || path.starts_with("//") {
        return reject("path must be relative to the module asset base");
    }
    if path.contains('\\') {
        return reject("backslashes are not allowed");
    }
    if scheme_regex().is_match(path) {
        return reject("URL schemes are not allowed");
    }
    if path.split('/').any(|segment| segment == "..") {
        return reject("parent directory segments are not allowed");
    }
    if path.chars().any(|c| c.is_control() || c == '"' || c == '<' || c == '>') {
        return reject("path contains characters that cannot appear in a tag attribute");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        for path in ["style.css", "css/table.css", "lib/v1.2/plot.js", "./a.css"] {
            assert!(validate_asset_path(path).is_ok(), "{} should be valid", path);
        }
    }

    #[test]
    fn test_rejected_paths() {
        for path in [
            "",
            "/etc/passwd",
            "../secret.css",
            "css/../../x.css",
            "https://cdn.example.com/x.css",
            "javascript:alert(1)",
            "css\\x.css",
            "x\".css",
        ] {
            let result = validate_asset_path(path);
            assert!(
                matches!(result, Err(HtmlViewError::AssetPathRejected { .. })),
                "{:?} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_validate_document_checks_scripts() {
        let doc = HtmlDocument::new("<p>x</p>")
            .with_stylesheet("ok.css")
            .with_script("../bad.js");
        let err = validate_document(&doc).unwrap_err();
        match err {
            HtmlViewError::AssetPathRejected { path, .. } => assert_eq!(path, "../bad.js"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
