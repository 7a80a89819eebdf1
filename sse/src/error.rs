//! Error types for the `sse` crate.
use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

/// Error returned by `Broker` and `Subscription` operations.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The broadcast loop has exited; nothing will be registered or delivered.
    ShutDown,
}

impl Error {
    pub fn shut_down() -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::ShutDown,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error_kind {
            ErrorKind::ShutDown => write!(f, "SSE Error: broker is shut down"),
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

// Producers only see the ingress contract, so a shut down broker reads as a closed target.
impl From<Error> for events::Error {
    fn from(err: Error) -> Self {
        match err.error_kind {
            ErrorKind::ShutDown => events::Error {
                source: Some(Box::new(err)),
                error_kind: events::ErrorKind::Closed,
            },
        }
    }
}
