use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to replace directory at {path}: {source}")]
    ReplaceDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cross-device hardlink not supported")]
    CrossDeviceHardlink,

    #[error("{path} was modified by another process since it was opened")]
    ModifiedExternally(PathBuf),

    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("operation failed: {0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
