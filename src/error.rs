//! Error types shared by every layer of the crate

use std::io;

use thiserror::Error;

use crate::format::FourCC;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy
///
/// Session state and input validation errors are usage errors and are never retried. Device
/// errors carry the name of the kernel operation that failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed size, format or protocol message
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation invoked outside of its legal session state
    #[error("cannot {op} in state {state}")]
    InvalidState { op: &'static str, state: &'static str },

    /// Configuration change attempted while buffers are allocated
    #[error("cannot {0} while the session is up")]
    Busy(&'static str),

    /// No device matched the selector
    #[error("no device matching {0}")]
    NotFound(String),

    /// Underlying kernel operation failed
    #[error("device {op} failed: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Pixel format the converter has no path for
    #[error("unsupported pixel format {0}")]
    Unsupported(FourCC),

    /// Socket or transfer failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Readiness wait exceeded its bound
    #[error("{0} timed out")]
    Timeout(&'static str),
}

/// Plain discriminant of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InvalidState,
    Busy,
    NotFound,
    Device,
    Unsupported,
    Io,
    Timeout,
}

impl Error {
    pub(crate) fn device(op: &'static str, source: io::Error) -> Self {
        Error::Device { op, source }
    }

    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::InvalidState { .. } => ErrorKind::InvalidState,
            Error::Busy(_) => ErrorKind::Busy,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Device { .. } => ErrorKind::Device,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::Io(_) => ErrorKind::Io,
            Error::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Whether the client connection that produced this error must be dropped
    pub fn is_fatal_for_connection(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Io | ErrorKind::Timeout | ErrorKind::InvalidInput
        )
    }
}
