//! Error types for model_loader

use thiserror::Error;

/// Result type for model_loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for model_loader
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    #[error("Definition `{0}` has neither a table name nor a global id")]
    MissingIdentifier(String),

    #[error("Model registration error: {0}")]
    ModelRegistrationError(String),

    #[error("Model initialization error: {0}")]
    InitializationError(String),

    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Declared definition files map their own parse errors; bare TOML errors come from config files
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
