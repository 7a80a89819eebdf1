use crate::connection::{SubscriberId, SubscriberRegistry};
use crate::error::{Error, Result};
use crate::message::Event;
use crate::subscription::{DeregisterGuard, Subscription};
use async_trait::async_trait;
use log::*;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_EVENT_BUFFER: usize = 1;
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 1;

/// What the broadcast loop does when a subscriber's buffer is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlowSubscriberPolicy {
    /// Wait for room. A stalled subscriber holds up every subscriber after it
    /// and every event after this one, until it drains or shutdown fires.
    #[default]
    Block,
    /// Never wait. A subscriber whose buffer is full is dropped from the
    /// registry; its stream ends after the events already buffered.
    Disconnect,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SlowSubscriberPolicyParseError;

impl fmt::Display for SlowSubscriberPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected one of: block, disconnect")
    }
}

impl std::error::Error for SlowSubscriberPolicyParseError {}

impl FromStr for SlowSubscriberPolicy {
    type Err = SlowSubscriberPolicyParseError;
    fn from_str(policy: &str) -> std::result::Result<SlowSubscriberPolicy, Self::Err> {
        match policy.to_lowercase().as_str() {
            "block" => Ok(SlowSubscriberPolicy::Block),
            "disconnect" => Ok(SlowSubscriberPolicy::Disconnect),
            _ => Err(SlowSubscriberPolicyParseError),
        }
    }
}

impl fmt::Display for SlowSubscriberPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlowSubscriberPolicy::Block => write!(f, "block"),
            SlowSubscriberPolicy::Disconnect => write!(f, "disconnect"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of the inbound event channel shared by all producers.
    pub event_buffer: usize,
    /// Capacity of each subscriber's own channel.
    pub subscriber_buffer: usize,
    pub slow_subscriber_policy: SlowSubscriberPolicy,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            slow_subscriber_policy: SlowSubscriberPolicy::default(),
        }
    }
}

pub(crate) struct Registration {
    id: SubscriberId,
    sender: mpsc::Sender<Event>,
    ack: oneshot::Sender<()>,
}

pub(crate) struct Deregistration {
    pub(crate) id: SubscriberId,
    /// Answered with whether the subscriber was still registered.
    pub(crate) ack: Option<oneshot::Sender<bool>>,
}

/// Handle to the broadcast loop.
///
/// Cheap to clone; every clone talks to the same loop. Producers call
/// `publish`, streaming handlers call `subscribe`.
#[derive(Clone)]
pub struct Broker {
    events: mpsc::Sender<Event>,
    registrations: mpsc::UnboundedSender<Registration>,
    deregistrations: mpsc::UnboundedSender<Deregistration>,
    queries: mpsc::UnboundedSender<oneshot::Sender<usize>>,
    shutdown: CancellationToken,
    subscriber_buffer: usize,
}

impl Broker {
    /// Create the broker and spawn its broadcast loop on the current tokio runtime.
    pub fn new(config: BrokerConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (registrations_tx, registrations_rx) = mpsc::unbounded_channel();
        let (deregistrations_tx, deregistrations_rx) = mpsc::unbounded_channel();
        let (queries_tx, queries_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let broadcast_loop = BroadcastLoop {
            registry: SubscriberRegistry::new(),
            events: events_rx,
            registrations: registrations_rx,
            deregistrations: deregistrations_rx,
            queries: queries_rx,
            shutdown: shutdown.clone(),
            policy: config.slow_subscriber_policy,
        };
        tokio::spawn(broadcast_loop.run());

        info!(
            "Broker started: event_buffer={}, subscriber_buffer={}, slow_subscriber_policy={}",
            config.event_buffer.max(1),
            config.subscriber_buffer.max(1),
            config.slow_subscriber_policy
        );

        Self {
            events: events_tx,
            registrations: registrations_tx,
            deregistrations: deregistrations_tx,
            queries: queries_tx,
            shutdown,
            subscriber_buffer: config.subscriber_buffer.max(1),
        }
    }

    /// Register a new subscriber channel.
    ///
    /// Returns once the loop has processed the registration, so every event
    /// published afterwards reaches the new subscriber.
    pub async fn subscribe(&self) -> Result<Subscription> {
        if self.is_shut_down() {
            return Err(Error::shut_down());
        }

        let id = SubscriberId::new();
        let (sender, receiver) = mpsc::channel(self.subscriber_buffer);
        let (ack, acked) = oneshot::channel();

        // Armed before the request goes out so a cancelled subscribe still deregisters.
        let guard = DeregisterGuard::new(id, self.deregistrations.clone());

        self.registrations
            .send(Registration { id, sender, ack })
            .map_err(|_| Error::shut_down())?;
        acked.await.map_err(|_| Error::shut_down())?;

        Ok(Subscription::new(id, receiver, guard))
    }

    /// Enqueue one event for every currently registered subscriber.
    pub async fn publish(&self, event: impl Into<Event>) -> Result<()> {
        if self.is_shut_down() {
            return Err(Error::shut_down());
        }
        self.events
            .send(event.into())
            .await
            .map_err(|_| Error::shut_down())
    }

    /// Number of registered subscribers, as seen by the loop.
    pub async fn subscriber_count(&self) -> Result<usize> {
        let (reply, count) = oneshot::channel();
        self.queries.send(reply).map_err(|_| Error::shut_down())?;
        count.await.map_err(|_| Error::shut_down())
    }

    /// Signal the loop to exit. Safe to call any number of times.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Broker shutdown requested");
        }
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once the broadcast loop has exited.
    pub async fn closed(&self) {
        self.events.closed().await
    }
}

#[async_trait]
impl events::Publisher for Broker {
    async fn publish(&self, payload: events::Payload) -> std::result::Result<(), events::Error> {
        Broker::publish(self, Event::from(payload))
            .await
            .map_err(Into::into)
    }
}

/// Sole owner of the registry.
///
/// Every input is handled to completion before the next one is selected, so
/// registry mutation and fan-out never overlap.
struct BroadcastLoop {
    registry: SubscriberRegistry,
    events: mpsc::Receiver<Event>,
    registrations: mpsc::UnboundedReceiver<Registration>,
    deregistrations: mpsc::UnboundedReceiver<Deregistration>,
    queries: mpsc::UnboundedReceiver<oneshot::Sender<usize>>,
    shutdown: CancellationToken,
    policy: SlowSubscriberPolicy,
}

impl BroadcastLoop {
    async fn run(mut self) {
        loop {
            // Control messages win over events so a registration sent before a
            // publish is always in place when that event fans out.
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(registration) = self.registrations.recv() => self.register(registration),
                Some(deregistration) = self.deregistrations.recv() => self.deregister(deregistration),
                Some(reply) = self.queries.recv() => {
                    let _ = reply.send(self.registry.len());
                }
                event = self.events.recv() => match event {
                    Some(event) => {
                        if self.broadcast(event).await.is_break() {
                            break;
                        }
                    }
                    // Every broker handle is gone; nobody can publish again.
                    None => break,
                },
            }
        }

        info!(
            "Broadcast loop exited with {} registered subscribers",
            self.registry.len()
        );
    }

    fn register(&mut self, registration: Registration) {
        let Registration { id, sender, ack } = registration;
        self.registry.register(id, sender);
        info!(
            "Subscriber {id} added. {} registered subscribers",
            self.registry.len()
        );
        let _ = ack.send(());
    }

    fn deregister(&mut self, deregistration: Deregistration) {
        let Deregistration { id, ack } = deregistration;
        let removed = self.registry.unregister(&id);
        if removed {
            info!(
                "Subscriber {id} removed. {} registered subscribers",
                self.registry.len()
            );
        } else {
            debug!(
                "Subscriber {id} was not registered. {} registered subscribers",
                self.registry.len()
            );
        }
        if let Some(ack) = ack {
            let _ = ack.send(removed);
        }
    }

    /// Deliver `event` to every registered subscriber, one after another.
    async fn broadcast(&mut self, event: Event) -> ControlFlow<()> {
        let mut evicted = Vec::new();

        for (id, sender) in self.registry.iter() {
            match self.policy {
                SlowSubscriberPolicy::Block => {
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => return ControlFlow::Break(()),
                        sent = sender.send(event.clone()) => {
                            if sent.is_err() {
                                trace!("Subscriber {id} is gone, awaiting its deregistration");
                            }
                        }
                    }
                }
                SlowSubscriberPolicy::Disconnect => match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => evicted.push(*id),
                    Err(TrySendError::Closed(_)) => {
                        trace!("Subscriber {id} is gone, awaiting its deregistration");
                    }
                },
            }
        }

        for id in evicted {
            self.registry.unregister(&id);
            warn!(
                "Disconnecting slow subscriber {id}. {} registered subscribers",
                self.registry.len()
            );
        }

        ControlFlow::Continue(())
    }
}
