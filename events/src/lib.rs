//! Event ingress contract for the relay.
//!
//! This crate defines how producers hand payloads to whatever fans them out,
//! without depending on the broker itself.
//!
//! # Architecture
//!
//! - **Payload**: an opaque, immutable byte buffer. No topic, id or timestamp
//!   travels with it; ordering is the order in which it is published.
//! - **Publisher**: the single ingress operation. The broker implements it, and
//!   so does the Redis-backed publisher in the `bridge` crate.
//! - **Ticker**: a periodic synthetic producer, handy for demos and smoke tests.
//!
//! This crate has no dependencies on other internal crates, so both the broker
//! and the external feed bridge can depend on it without cycles.

use async_trait::async_trait;
use std::sync::Arc;

pub mod error;
pub mod ticker;

pub use bytes::Bytes;
pub use error::{Error, ErrorKind};
pub use ticker::Ticker;

/// Opaque message body handed from a producer to the broadcast side.
pub type Payload = Bytes;

/// Accepts payloads for delivery.
///
/// Implementations must be safe to call from any number of concurrent
/// producers without external synchronization.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Enqueue one payload. Returns an `ErrorKind::Closed` error once the
    /// target no longer accepts events.
    async fn publish(&self, payload: Payload) -> Result<(), Error>;
}

#[async_trait]
impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    async fn publish(&self, payload: Payload) -> Result<(), Error> {
        (**self).publish(payload).await
    }
}
