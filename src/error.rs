use std::sync::Arc;
use thiserror::Error;

/// Errors returned by the artifact managers and codecs
#[derive(Error, Debug, Clone)]
pub enum ManagerError {
    /// Domain failed validation, no I/O was performed
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// Artifact, record, entry or backend is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Artifact or record name is already taken
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Zone grammar or YAML could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Content parsed but is semantically invalid
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Backend index {index} out of range (record has {len} backends)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<std::io::Error> for ManagerError {
    fn from(err: std::io::Error) -> Self {
        ManagerError::Io(Arc::new(err))
    }
}

impl From<serde_yaml::Error> for ManagerError {
    fn from(err: serde_yaml::Error) -> Self {
        ManagerError::Parse(err.to_string())
    }
}

impl ManagerError {
    /// True when the error maps to a missing file on disk
    pub fn is_not_found(&self) -> bool {
        match self {
            ManagerError::NotFound(_) => true,
            ManagerError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid path for {0}")]
    InvalidPath(String),

    #[error("Failed to read configuration file: {0}")]
    Read(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}
