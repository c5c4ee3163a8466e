use thiserror::Error;

/// Errors produced by the shared-storage core.
///
/// Every variant except `Io` is a caller mistake and always recoverable; the
/// HTTP boundary matches on [`StoreError::code`] to pick a 4xx status.  `Io`
/// covers unanticipated filesystem failures (disk full, permission denied)
/// and maps to a generic 500.  A corrupt ledger is deliberately *not* an
/// error: reads degrade to an empty message list instead.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Message text was missing or blank after trimming.
    #[error("text must be a non-empty string")]
    InvalidText,

    /// A message id that is not a whole number.
    #[error("id must be a number")]
    InvalidId,

    /// No message with the given id exists in the ledger.
    #[error("message not found: {0}")]
    NotFound(i64),

    /// A filename that is empty, too long, hidden, or escapes the shared
    /// directory.
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    /// An upload request carried no files at all.
    #[error("at least one file is required")]
    NoFiles,

    /// Unanticipated I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Stable machine-checkable code consumed by the HTTP boundary.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidText => "EINVAL_TEXT",
            StoreError::InvalidId => "EINVAL_ID",
            StoreError::NotFound(_) => "ENOTFOUND",
            StoreError::InvalidFilename(_) => "EINVAL_FILENAME",
            StoreError::NoFiles => "ENOFILES",
            StoreError::Io(_) => "EUNEXPECTED",
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
