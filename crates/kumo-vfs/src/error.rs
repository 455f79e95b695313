//! VFS error types.

use std::io;

use strum::Display;
use thiserror::Error;

use crate::node::NodeId;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Operation is structurally disallowed in the current state
    /// (locked target, wrong node kind, root folder, move into own subtree).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Name collision or lock-state collision.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Nothing lives at the requested path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed path or item name.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The node was deleted (or the mount was reset) and the handle is stale.
    ///
    /// This is a caller bug, not a retryable condition.
    #[error("item already removed: {0}")]
    Removed(NodeId),

    /// I/O error while reading a caller-supplied stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Corrupt or unreadable zip archive.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Coarse classification of a [`VfsError`], for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Forbidden,
    Conflict,
    NotFound,
    Server,
    Removed,
}

impl VfsError {
    /// Create a Forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a Conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VfsError::Forbidden(_) | VfsError::InvalidPath(_) => ErrorKind::Forbidden,
            VfsError::Conflict(_) => ErrorKind::Conflict,
            VfsError::NotFound(_) => ErrorKind::NotFound,
            VfsError::Removed(_) => ErrorKind::Removed,
            VfsError::Io(_) | VfsError::Archive(_) => ErrorKind::Server,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind() == ErrorKind::Forbidden
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::Forbidden(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::Conflict(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Removed(id) => {
                io::Error::new(io::ErrorKind::NotFound, format!("item already removed: {id}"))
            }
            VfsError::Io(e) => e,
            VfsError::Archive(e) => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
