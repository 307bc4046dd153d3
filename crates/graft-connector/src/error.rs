//! Connector error types.
//!
//! Two tiers share one enum. Ordinary outcomes (`NotFound`, `Busy`, ...)
//! are what a protocol handler turns into an errno. `Invariant` means the
//! kernel and the connector disagree about the tree; it is logged when it
//! is built and fails the request instead of being retried.

use std::io;
use thiserror::Error;

/// Connector error type.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Path component, node or mount not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Name already present where a mount point was requested.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Resource in use (open files, nested mounts, mount point rename).
    #[error("busy: {0}")]
    Busy(String),

    /// Argument does not name something the operation can act on.
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Handle was forgotten (or never issued).
    #[error("stale handle: {0:#x}")]
    StaleHandle(u64),

    /// Internal consistency violated; the kernel protocol rules this out.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// Error reported by the kernel notification channel.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectorError {
    /// Create a NotFound error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    /// Create a Busy error.
    pub fn busy(what: impl Into<String>) -> Self {
        Self::Busy(what.into())
    }

    /// Create an Invalid error.
    pub fn invalid(what: impl Into<String>) -> Self {
        Self::Invalid(what.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(what: impl Into<String>) -> Self {
        Self::NotADirectory(what.into())
    }

    /// Create an Invariant error and log it.
    pub fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::error!(violation = %msg, "connector invariant violated");
        Self::Invariant(msg)
    }

    /// Returns true for contract violations (as opposed to ordinary outcomes).
    pub fn is_invariant(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

/// Convert ConnectorError to std::io::Error for the protocol layer.
impl From<ConnectorError> for io::Error {
    fn from(e: ConnectorError) -> Self {
        match e {
            ConnectorError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            ConnectorError::AlreadyExists(msg) => {
                io::Error::new(io::ErrorKind::AlreadyExists, msg)
            }
            ConnectorError::Busy(msg) => io::Error::new(io::ErrorKind::ResourceBusy, msg),
            ConnectorError::Invalid(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            ConnectorError::NotADirectory(msg) => {
                io::Error::new(io::ErrorKind::NotADirectory, msg)
            }
            ConnectorError::StaleHandle(id) => {
                io::Error::new(io::ErrorKind::NotFound, format!("stale handle {id:#x}"))
            }
            ConnectorError::Invariant(msg) => io::Error::other(msg),
            ConnectorError::Io(e) => e,
        }
    }
}

/// Connector result type.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
