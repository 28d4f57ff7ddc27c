//! Error types for the filesystem port.

use std::io;

use thiserror::Error;

/// Errors raised below the driver boundary.
///
/// None of these reach the UI toolkit: the driver callbacks fold every
/// failure into [`FsRes::Unknown`](crate::driver::FsRes::Unknown).
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Path too long: {len} bytes (max {max})")]
    PathTooLong { len: usize, max: usize },

    #[error("Volume not mounted")]
    NotMounted,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Mount failed: {0}")]
    MountFailed(String),

    #[error("No space left on volume")]
    NoSpace,

    #[error("Invalid volume letter: {0:?}")]
    InvalidLetter(char),

    #[error("Volume letter already registered: {0}")]
    AlreadyRegistered(char),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Bundle error: {0}")]
    Bundle(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::Io(e) => return io::Error::new(e.kind(), e.to_string()),
            FsError::NotFound(_) => io::ErrorKind::NotFound,
            FsError::AlreadyExists(_) => io::ErrorKind::AlreadyExists,
            FsError::NoSpace => io::ErrorKind::StorageFull,
            FsError::PathTooLong { .. } | FsError::InvalidLetter(_) => {
                io::ErrorKind::InvalidInput
            }
            FsError::NotADirectory(_) => io::ErrorKind::NotADirectory,
            FsError::IsADirectory(_) => io::ErrorKind::IsADirectory,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
