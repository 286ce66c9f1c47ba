use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

impl TriageError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Bad input from the caller; reported as a client error, never as a fallback decision.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ValidationError { .. })
    }

    /// The pipeline cannot be built at all (e.g. no credentials for the reasoning service).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::MissingConfigError { .. }
                | Self::ConfigError { .. }
                | Self::InvalidConfigValueError { .. }
                | Self::ConfigValidationError { .. }
                | Self::HttpClientError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let validation = TriageError::validation("too short");
        assert!(validation.is_client_error());
        assert!(!validation.is_unavailable());

        let missing = TriageError::MissingConfigError {
            field: "reasoning.api_key".to_string(),
        };
        assert!(!missing.is_client_error());
        assert!(missing.is_unavailable());
        assert_eq!(missing.to_string(), "Missing configuration: reasoning.api_key");
    }
}
