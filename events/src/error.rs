//! Error types for the `events` crate.
use std::error::Error as StdError;
use std::fmt;

/// Error returned by a `Publisher`.
/// Holds the error kind and an optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The publish target has shut down and will never accept another event.
    Closed,
    /// The target is alive but could not take this event (e.g. a network hiccup).
    Backend,
}

impl Error {
    pub fn closed() -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::Closed,
        }
    }

    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error {
            source: Some(err.into()),
            error_kind: ErrorKind::Backend,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.error_kind == ErrorKind::Closed
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "Publish Error: {:?}: {source}", self.error_kind),
            None => write!(f, "Publish Error: {:?}", self.error_kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
