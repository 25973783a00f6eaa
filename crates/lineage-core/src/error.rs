use thiserror::Error;

/// An identifier that cannot be substituted into query text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier {0:?} contains invalid characters. Allowed: A-Z a-z 0-9 _")]
    InvalidCharacters(String),
}

/// Errors raised while loading configuration or reference data.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid feature set: {0}")]
    FeatureSet(#[from] serde_json::Error),
}
