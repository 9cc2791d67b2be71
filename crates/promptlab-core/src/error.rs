use thiserror::Error;

/// Top-level error type for the promptlab crates.
#[derive(Debug, Error)]
pub enum LabError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Logger error: {0}")]
    Logger(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Pre-run validation failures. All of these surface before any
/// external call is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dataset reference is empty")]
    MissingDatasetRef,

    #[error("dataset '{0}' not found")]
    DatasetNotFound(String),

    #[error("no prompt with non-empty text is configured")]
    NoPrompts,

    #[error("no scorer is configured")]
    NoScorers,

    #[error("could not infer an input field from the dataset")]
    NoInputField,

    #[error("an evaluation run is already in progress")]
    RunInProgress,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
}

pub type Result<T> = std::result::Result<T, LabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::MissingDatasetRef;
        assert_eq!(err.to_string(), "dataset reference is empty");
    }

    #[test]
    fn model_error_display() {
        let err = ModelError::ApiRequest("timeout".into());
        assert_eq!(err.to_string(), "API request failed: timeout");
    }

    #[test]
    fn model_error_rate_limited_display() {
        let err = ModelError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "Rate limited: retry after Some(30)s");
    }

    #[test]
    fn lab_error_from_config_error() {
        let err: LabError = ConfigError::NoScorers.into();
        assert!(matches!(err, LabError::Config(ConfigError::NoScorers)));
        assert!(err.to_string().contains("no scorer"));
    }

    #[test]
    fn lab_error_from_model_error() {
        let err: LabError = ModelError::Auth("bad key".into()).into();
        assert!(matches!(err, LabError::Model(ModelError::Auth(_))));
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn lab_error_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: LabError = serde_err.into();
        assert!(matches!(err, LabError::Serialization(_)));
    }
}
