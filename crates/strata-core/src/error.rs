use std::path::PathBuf;

/// Error taxonomy from the design (not a type hierarchy): one flat enum,
/// matching the style of `pulith_archive::Error` and `strata_fs::Error` —
/// named variants carrying the offending path/detail, no bare strings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed extended-archive path: {0}")]
    Path(#[from] PathError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O failure on a stream with no associated host path (a scratch
    /// buffer, a cursor over extracted bytes).
    #[error(transparent)]
    Stream(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("could not identify contents of {label}: {detail}")]
    Format { label: String, detail: String },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("not writable: {0}")]
    NotWritable(String),

    #[error("ambiguous: {0}")]
    Ambiguous(String),

    #[error("cancelled")]
    Cancelled,

    #[error("conversion not representable: {0}")]
    Conversion(String),

    #[error("{0} is a directory, not a file")]
    DirectoryAsFile(String),

    #[error("{0} is a file, not a directory")]
    FileAsDirectory(String),

    #[error("nesting not supported here: {0}")]
    UnsupportedNesting(String),

    #[error(transparent)]
    Fs(#[from] strata_fs::Error),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path component {index} is empty")]
    EmptyComponent { index: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
