//! Error handling
//!
//! Validation failures abort the current call; I/O failures carry the path
//! they happened on. Line parse failures never abort anything and are kept
//! on the offending [`Record`](crate::Record) instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by store operations
#[derive(Error, Debug)]
pub enum HostsError {
    /// Address failed IPv4/IPv6 syntax validation
    #[error("{0:?} is an invalid IP address")]
    InvalidAddress(String),

    /// Name failed DNS name validation
    #[error("hostname is not a valid dns name: {0:?}")]
    InvalidName(String),

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File not found (when expected to exist)
    #[error("File not found: '{path}'")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HostsError {
    /// Classify an I/O error raised while reading `path`
    pub fn from_read(error: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::classify(error, path).unwrap_or_else(|(error, path)| HostsError::ReadError {
            path,
            source: error,
        })
    }

    /// Classify an I/O error raised while writing `path`
    pub fn from_write(error: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::classify(error, path).unwrap_or_else(|(error, path)| HostsError::WriteError {
            path,
            source: error,
        })
    }

    fn classify(error: io::Error, path: PathBuf) -> Result<Self, (io::Error, PathBuf)> {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Ok(HostsError::PermissionDenied {
                path,
                source: error,
            }),
            io::ErrorKind::NotFound => Ok(HostsError::NotFound {
                path,
                source: error,
            }),
            _ if is_disk_full_error(&error) => Ok(HostsError::DiskFull {
                path,
                source: error,
            }),
            _ => Err((error, path)),
        }
    }

    /// True for syntax failures of an address or a name
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HostsError::InvalidAddress(_) | HostsError::InvalidName(_)
        )
    }

    /// True for any failure of the underlying file
    pub fn is_io(&self) -> bool {
        !self.is_validation()
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// A line whose address could not be parsed
///
/// Attached to the record and surfaced only on inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad hosts line: {line:?}")]
pub struct LineParseError {
    /// The field portion of the line (comment stripped)
    pub line: String,
}

/// Result type for store operations
pub type HostsResult<T> = Result<T, HostsError>;
