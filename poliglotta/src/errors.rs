//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = PoliglottaError> = core::result::Result<T, E>;

#[derive(Debug)]
pub enum PoliglottaError {
    InvalidModel(InvalidModelError),
    InvalidArgument(InvalidArgumentError),
    NotSupported(NotSupportedError),
    IOError(std::io::Error),
}

impl PoliglottaError {
    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn not_supported<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::NotSupported(NotSupportedError { msg: msg.into() })
    }
}

impl fmt::Display for PoliglottaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidModel(e) => e.fmt(f),
            Self::InvalidArgument(e) => e.fmt(f),
            Self::NotSupported(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for PoliglottaError {}

/// Error used when the model is invalid.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when the requested operation has no implementation.
#[derive(Debug)]
pub struct NotSupportedError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NotSupportedError: {}", self.msg)
    }
}

impl Error for NotSupportedError {}

impl From<std::io::Error> for PoliglottaError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
