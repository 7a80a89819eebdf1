use crate::broker::Deregistration;
use crate::connection::SubscriberId;
use crate::error::{Error, Result};
use crate::message::Event;
use log::*;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{Receiver, UnboundedSender};
use tokio::sync::oneshot;

/// The receiving end of one subscriber channel.
///
/// Dropping a `Subscription` deregisters it. This happens exactly once no
/// matter how the owner exits, unless `unsubscribe` already did it.
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<Event>,
    guard: DeregisterGuard,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, receiver: Receiver<Event>, guard: DeregisterGuard) -> Self {
        Self {
            id,
            receiver,
            guard,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. `None` once the broker stopped writing to this
    /// channel: after deregistration, eviction or shutdown.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> std::result::Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Deregister now and wait until the broker has processed it.
    ///
    /// Returns whether the subscriber was still registered. Calling it again,
    /// or dropping the subscription afterwards, sends nothing further.
    pub async fn unsubscribe(&mut self) -> Result<bool> {
        let Some(deregistrations) = self.guard.disarm() else {
            return Ok(false);
        };

        let (ack, acked) = oneshot::channel();
        deregistrations
            .send(Deregistration {
                id: self.id,
                ack: Some(ack),
            })
            .map_err(|_| Error::shut_down())?;
        acked.await.map_err(|_| Error::shut_down())
    }
}

/// Sends the deregistration request for `id` when dropped, unless disarmed.
pub(crate) struct DeregisterGuard {
    id: SubscriberId,
    deregistrations: Option<UnboundedSender<Deregistration>>,
}

impl DeregisterGuard {
    pub(crate) fn new(id: SubscriberId, deregistrations: UnboundedSender<Deregistration>) -> Self {
        Self {
            id,
            deregistrations: Some(deregistrations),
        }
    }

    fn disarm(&mut self) -> Option<UnboundedSender<Deregistration>> {
        self.deregistrations.take()
    }
}

impl Drop for DeregisterGuard {
    fn drop(&mut self) {
        if let Some(deregistrations) = self.disarm() {
            debug!("Subscriber {} released, requesting deregistration", self.id);
            // A closed channel means the loop already exited and took the registry with it.
            let _ = deregistrations.send(Deregistration {
                id: self.id,
                ack: None,
            });
        }
    }
}
