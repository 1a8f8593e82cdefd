// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for RimIO operations.
pub type RimIOResult<T = ()> = core::result::Result<T, RimIOError>;

/// Error type for RimIO operations.
#[derive(Debug)]
pub enum RimIOError {
    /// Underlying OS error (file, block device).
    Io(std::io::Error),
    /// Attempted to read or write out of bounds.
    OutOfBounds,
    Unsupported,
    Invalid(&'static str),
    Other(&'static str),
}

impl RimIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            RimIOError::Io(_) => "I/O error",
            RimIOError::OutOfBounds => "Out of bounds",
            RimIOError::Unsupported => "Unsupported operation",
            RimIOError::Invalid(msg) => msg,
            RimIOError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for RimIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        RimIOError::Other(msg)
    }
}

impl From<std::io::Error> for RimIOError {
    #[cold]
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => RimIOError::OutOfBounds,
            _ => RimIOError::Io(e),
        }
    }
}

impl fmt::Display for RimIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RimIOError::Io(e) => write!(f, "{}: {e}", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for RimIOError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RimIOError::Io(e) => Some(e),
            _ => None,
        }
    }
}
