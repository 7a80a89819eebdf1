use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

/// Body sent to clients whose transport cannot stream.
pub const STREAMING_UNSUPPORTED: &str = "Streaming unsupported!";

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// The connection cannot flush a partial response.
    StreamingUnsupported,
    /// The broker has shut down and accepts no new subscribers.
    BrokerUnavailable,
    /// Two routes were configured on the same path.
    RouteConflict,
}

impl Error {
    pub fn streaming_unsupported() -> Self {
        Error {
            source: None,
            error_kind: WebErrorKind::StreamingUnsupported,
        }
    }

    pub fn route_conflict(path: impl Into<String>) -> Self {
        let path = path.into();
        Error {
            source: Some(format!("stream path {path} is already routed").into()),
            error_kind: WebErrorKind::RouteConflict,
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

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::StreamingUnsupported => {
                (StatusCode::INTERNAL_SERVER_ERROR, STREAMING_UNSUPPORTED).into_response()
            }
            WebErrorKind::BrokerUnavailable => {
                warn!("Rejecting request, broker is shut down");
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
            }
            WebErrorKind::RouteConflict => {
                error!("Route conflict: {self}");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl From<sse::Error> for Error {
    fn from(err: sse::Error) -> Self {
        match err.error_kind {
            sse::ErrorKind::ShutDown => Error {
                source: Some(Box::new(err)),
                error_kind: WebErrorKind::BrokerUnavailable,
            },
        }
    }
}
