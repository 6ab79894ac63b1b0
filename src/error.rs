use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Error, Debug)]
pub enum Error {
    #[error("config_version is missing, the configuration file predates this release")]
    LegacyConfig,

    #[error("config_version {found} is older than the required {required}")]
    IncompatibleConfig { found: String, required: String },

    #[error("unknown documentation driver: {0}")]
    UnknownDriver(String),

    #[error("production_path is not set for driver {0}")]
    MissingProductionPath(String),

    #[error("unsupported security mode: {0}")]
    WrongSecurityConfig(String),

    #[error("documentation file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("cannot detect text encoding for {0}")]
    Encoding(String),

    #[error("invalid recorded exchange: {0}")]
    InvalidExchange(String),

    #[error("invalid document {}: {message}", .file.display())]
    InvalidDocument { file: PathBuf, message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}
