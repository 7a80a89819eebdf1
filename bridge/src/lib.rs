//! Bridge from an external Redis publish/subscribe feed into the relay.
//!
//! The bridge owns its backend connection entirely: connecting, health
//! checking, subscribing and reconnecting after failures. Nothing here can
//! take the broker down; a dead feed simply means no events from this source.
//!
//! Payloads are handed on through `events::Publisher`, so the bridge never
//! sees the broker type.

use bytes::Bytes;
use events::Publisher;
use futures_util::{Stream, StreamExt};
use log::*;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub mod error;

pub use error::{Error, ErrorKind, Result};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Backend URL, e.g. `redis://127.0.0.1:6379`.
    pub address: String,
    /// Channel pattern (PSUBSCRIBE syntax), so `news.*` matches `news.sports`.
    pub topic: String,
    /// Pause between a failure and the next connection attempt.
    pub retry_delay: Duration,
}

impl FeedConfig {
    pub fn new(address: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            topic: topic.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Why a forwarding session ended without an error.
#[derive(Debug, PartialEq, Eq)]
pub enum Forwarded {
    /// The feed stopped producing messages (connection dropped).
    FeedEnded,
    /// The publisher no longer accepts events; there is no point reconnecting.
    TargetClosed,
}

pub struct Bridge<P> {
    config: FeedConfig,
    publisher: P,
}

impl<P> Bridge<P>
where
    P: Publisher,
{
    pub fn new(config: FeedConfig, publisher: P) -> Self {
        Self { config, publisher }
    }

    /// Forward feed messages until cancelled or the publisher closes.
    ///
    /// Every failure is logged and retried after `retry_delay`.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.connect_and_forward() => outcome,
            };

            match outcome {
                Ok(Forwarded::TargetClosed) => {
                    info!("Publish target closed, stopping feed bridge");
                    return;
                }
                Ok(Forwarded::FeedEnded) => {
                    warn!("Feed {} ended", self.config.address);
                }
                Err(e) => {
                    error!("Feed {} unavailable: {e}", self.config.address);
                }
            }

            debug!("Reconnecting to feed in {:?}", self.config.retry_delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.retry_delay) => {}
            }
        }

        info!("Feed bridge cancelled");
    }

    async fn connect_and_forward(&self) -> Result<Forwarded> {
        let client = redis::Client::open(self.config.address.as_str())?;

        let mut connection = client.get_multiplexed_async_connection().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut connection).await?;

        let mut pubsub = client.get_async_pubsub().await?;
        pubsub
            .psubscribe(self.config.topic.as_str())
            .await
            .map_err(Error::subscription)?;
        info!(
            "Subscribed to {} on {}",
            self.config.topic, self.config.address
        );

        let messages = pubsub
            .on_message()
            .map(|message| Bytes::copy_from_slice(message.get_payload_bytes()));
        forward(messages, &self.publisher).await
    }
}

/// Publish every payload from `messages` until it ends or the publisher closes.
///
/// Transient publish failures drop that one message and carry on.
pub async fn forward<S, P>(messages: S, publisher: &P) -> Result<Forwarded>
where
    S: Stream<Item = Bytes>,
    P: Publisher + ?Sized,
{
    futures_util::pin_mut!(messages);

    while let Some(payload) = messages.next().await {
        trace!("Received {} byte message from feed", payload.len());
        match publisher.publish(payload).await {
            Ok(()) => {}
            Err(e) if e.is_closed() => return Ok(Forwarded::TargetClosed),
            Err(e) => warn!("Dropping feed message: {e}"),
        }
    }

    Ok(Forwarded::FeedEnded)
}

/// A `Publisher` that puts payloads on the feed topic instead of the broker.
///
/// With a bridge subscribed to the same topic this loops events through the
/// backend and back into the stream.
#[derive(Clone)]
pub struct RedisPublisher {
    connection: MultiplexedConnection,
    topic: String,
}

impl RedisPublisher {
    pub async fn connect(address: &str, topic: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(address)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            connection,
            topic: topic.into(),
        })
    }
}

#[async_trait::async_trait]
impl Publisher for RedisPublisher {
    async fn publish(&self, payload: events::Payload) -> std::result::Result<(), events::Error> {
        let mut connection = self.connection.clone();
        let published: redis::RedisResult<()> =
            connection.publish(self.topic.as_str(), payload.to_vec()).await;
        published.map_err(|e| events::Error::backend(Error::publish(e)))
    }
}
