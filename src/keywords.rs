//! Keyword file loading.
//!
//! The file is a JSON object with a top-level `"keywords"` array:
//!
//! ```json
//! { "keywords": ["quantum computing", "rust async runtimes"] }
//! ```

use serde_json::Value;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeywordsError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected an object with a \"keywords\" array")]
    MissingKeywords,
}

/// Load keywords from `path`.
///
/// Only an unreadable file is an error. Malformed content is logged and
/// yields no keywords.
pub fn load_keywords(path: &Path) -> Result<Vec<String>, KeywordsError> {
    match read_keywords(path) {
        Err(e @ KeywordsError::Io { .. }) => Err(e),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not parse keywords");
            Ok(Vec::new())
        }
        ok => ok,
    }
}

pub fn read_keywords(path: &Path) -> Result<Vec<String>, KeywordsError> {
    let content = std::fs::read_to_string(path).map_err(|source| KeywordsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_keywords(&content)
}

/// Parse a keyword document. Non-string and blank entries are skipped.
pub fn parse_keywords(content: &str) -> Result<Vec<String>, KeywordsError> {
    let value: Value = serde_json::from_str(content)?;
    let items = value
        .get("keywords")
        .and_then(Value::as_array)
        .ok_or(KeywordsError::MissingKeywords)?;

    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        let keywords =
            parse_keywords(r#"{"keywords": ["quantum computing", "  rust  ", "", 42, null]}"#)
                .unwrap();
        assert_eq!(keywords, vec!["quantum computing", "rust"]);
    }

    #[test]
    fn test_missing_key_is_error() {
        assert!(matches!(
            parse_keywords(r#"{"topics": ["a"]}"#),
            Err(KeywordsError::MissingKeywords)
        ));
        assert!(matches!(
            parse_keywords(r#"["a", "b"]"#),
            Err(KeywordsError::MissingKeywords)
        ));
        assert!(matches!(
            parse_keywords("{not json"),
            Err(KeywordsError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_error() {
        assert!(matches!(
            load_keywords(Path::new("/nonexistent/keywords.json")),
            Err(KeywordsError::Io { .. })
        ));
    }

    #[test]
    fn test_load_malformed_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_keywords(&path).unwrap().is_empty());

        std::fs::write(&path, r#"{"topics": ["a"]}"#).unwrap();
        assert!(load_keywords(&path).unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, r#"{"keywords": ["a", "b"]}"#).unwrap();
        assert_eq!(load_keywords(&path).unwrap(), vec!["a", "b"]);
    }
}
