//! Error types for geoip_core

use std::error::Error as StdError;
use std::fmt;

/// Stable classification of every error the crate can return.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidPrefix = 1,
    FetchFailed = 2,
    BuildAborted = 3,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidPrefix => "Invalid prefix",
            ErrorCode::FetchFailed => "Data source fetch failed",
            ErrorCode::BuildAborted => "Index build aborted",
        }
    }
}

/// Malformed CIDR or address text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    input: String,
    reason: String,
}

impl ParseError {
    pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CIDR {:?}: {}", self.input, self.reason)
    }
}

impl StdError for ParseError {}

/// The data source could not produce a dataset.
#[derive(Debug)]
pub struct FetchError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{}: {}", self.message, src),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for FetchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::with_source("I/O error while reading data source", e)
    }
}

#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Fetch(FetchError),
    /// A dataset entry was rejected; nothing from the batch was installed.
    BuildAborted {
        position: usize,
        cidr: String,
        source: ParseError,
    },
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse(_) => ErrorCode::InvalidPrefix,
            Error::Fetch(_) => ErrorCode::FetchFailed,
            Error::BuildAborted { .. } => ErrorCode::BuildAborted,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{e}"),
            Error::Fetch(e) => write!(f, "fetch failed: {e}"),
            Error::BuildAborted {
                position,
                cidr,
                source,
            } => write!(
                f,
                "update aborted at entry #{position} ({cidr:?}): {}",
                source.reason()
            ),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Fetch(e) => Some(e),
            Error::BuildAborted { source, .. } => Some(source),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Error::Fetch(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
