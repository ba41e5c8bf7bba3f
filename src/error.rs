//! Error type shared by every app_keeper module.
//!
//! Storage and update-check failures are normally converted into results or
//! logged by the caller; binding and relaunch errors are meant to reach the host.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("settings file {path} is corrupt: {reason}")]
    StorageCorrupt { path: PathBuf, reason: String },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize setting value: {0}")]
    Serialize(String),

    #[error("managed property '{name}' cannot be bound: {reason}")]
    PropertyBinding { name: String, reason: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid update descriptor: {0}")]
    DescriptorParse(String),

    #[error("checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to relaunch {program}")]
    RelaunchFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid version string '{0}'")]
    InvalidVersion(String),

    #[error("invalid culture tag '{0}'")]
    InvalidCulture(String),

    #[error("invalid window geometry: {0}")]
    InvalidGeometry(String),

    #[error("lifecycle binder used before initialize()")]
    NotInitialized,

    #[error("no update check URL configured")]
    MissingUpdateUrl,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn binding(name: &str, reason: impl ToString) -> Self {
        Error::PropertyBinding {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
