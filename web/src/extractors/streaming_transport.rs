use crate::error::Error;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, Version},
};
use log::*;

/// Proof that the connection can flush partial responses.
///
/// HTTP/0.9 and HTTP/1.0 have no chunked transfer encoding, so a response body
/// cannot be delivered incrementally over them.
pub(crate) struct StreamingTransport;

impl StreamingTransport {
    pub(crate) fn supports_incremental_flush(version: Version) -> bool {
        version != Version::HTTP_09 && version != Version::HTTP_10
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StreamingTransport
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if Self::supports_incremental_flush(parts.version) {
            Ok(StreamingTransport)
        } else {
            debug!("Refusing to stream over {:?}", parts.version);
            Err(Error::streaming_unsupported())
        }
    }
}
