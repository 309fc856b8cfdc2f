use thiserror::Error;

/// Typed application error hierarchy for every operation exposed by the
/// command layer.
///
/// Serializes as a plain string so JSON payload consumers receive the
/// message, while Rust callers can still match on variants and propagate
/// with `?`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Validation and not-found errors are caller mistakes; everything else
    /// is an environment failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::NotFound(_))
    }
}

impl serde::Serialize for AppError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

// ── From impls ─────────────────────────────────────────────────────────────

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Database(format!("{:#}", e))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_message() {
        let err = AppError::Validation("rating must be between 1 and 5".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Invalid input: rating must be between 1 and 5\"");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AppError::NotFound("episode 3".into()).is_client_error());
        assert!(AppError::Validation("empty".into()).is_client_error());
        assert!(!AppError::Database("locked".into()).is_client_error());
    }

    #[test]
    fn test_yaml_error_is_config_error() {
        let err: AppError = serde_yaml::from_str::<Vec<i64>>("[1, two").unwrap_err().into();
        assert!(matches!(err, AppError::Config(_)));
        assert!(!err.is_client_error());
    }
}
