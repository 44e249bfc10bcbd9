//! Error kinds surfaced by every boundary operation of the client.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection to {url} failed: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("server returned SOAP fault `{code}`: {message}")]
    Fault { code: String, message: String },

    #[error("unexpected response to `{operation}`: {reason}")]
    Protocol { operation: String, reason: String },

    #[error("report pack id `{id}` not found")]
    Resolution { id: u64 },

    #[error("report pack source directory {} does not exist", path.display())]
    ArchiveSource { path: PathBuf },

    #[error("archive {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("xml error in {context}: {reason}")]
    Xml { context: String, reason: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl Error {
    pub fn connectivity(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connectivity {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn xml(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Xml {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn archive(path: impl AsRef<Path>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// True for failures caused by the transport rather than the payload.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
