//! Server-Sent Events broadcast core.
//!
//! This crate fans out every event published on one inbound channel to every
//! subscriber registered at the moment the event is processed.
//!
//! # Architecture
//!
//! - **Single owner**: the broadcast loop is the only task that can see or
//!   change the subscriber registry. Registration, deregistration, fan-out and
//!   shutdown all arrive as messages and are handled one at a time, so the
//!   registry needs no lock.
//! - **Identity-keyed registry**: each subscriber channel carries a
//!   server-generated `SubscriberId`; membership is by id, not by payload.
//! - **Scoped deregistration**: a `Subscription` deregisters itself exactly
//!   once when dropped, whichever way its owner goes away.
//! - **Ephemeral events**: nothing is stored. A subscriber sees only events
//!   processed after its registration.
//!
//! # Delivery
//!
//! Fan-out visits subscribers sequentially. With `SlowSubscriberPolicy::Block`
//! a subscriber whose buffer is full holds up everyone behind it, and every
//! later event, until it drains. `SlowSubscriberPolicy::Disconnect` evicts such
//! a subscriber instead.
//!
//! # Example
//!
//! ```rust,ignore
//! let broker = sse::Broker::new(sse::BrokerConfig::default());
//!
//! let mut subscription = broker.subscribe().await?;
//! broker.publish("hello").await?;
//!
//! let event = subscription.recv().await;
//! let frame = sse::Framing::Sse.frame(&event.unwrap()); // b"data: hello\n\n"
//! ```
//!
//! # Modules
//!
//! - `broker`: the `Broker` handle and the broadcast loop it spawns
//! - `connection`: `SubscriberId` and the loop-owned registry
//! - `subscription`: per-connection receiving end with its drop guard
//! - `message`: `Event` payloads and wire `Framing`

pub mod broker;
pub mod connection;
pub mod error;
pub mod message;
pub mod subscription;

pub use broker::{Broker, BrokerConfig, SlowSubscriberPolicy};
pub use connection::SubscriberId;
pub use error::{Error, ErrorKind};
pub use message::{Event, Framing};
pub use subscription::Subscription;
