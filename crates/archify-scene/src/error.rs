//! Error types for the scene crate
//!
//! The sanitizer itself never fails; these cover the strict typed paths
//! (parsing documents this process wrote, encoding for storage) and
//! allow-list configuration.

/// Errors from strict document parsing and encoding
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// JSON syntax error or shape mismatch
    #[error("scene json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Allow-list configuration could not be used
    #[error("invalid allow-list: {0}")]
    InvalidAllowList(String),
}

/// Result alias for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_display() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SceneError::from(source);
        assert!(err.to_string().starts_with("scene json error"));
    }

    #[test]
    fn allow_list_error_display() {
        let err = SceneError::InvalidAllowList("empty name".to_string());
        assert_eq!(err.to_string(), "invalid allow-list: empty name");
    }
}
