use crate::message::Event;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc::Sender;

/// Identity of one subscriber channel (server-generated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(uuid::Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of live subscriber channels keyed by identity.
///
/// Owned by the broadcast loop and never shared, so it needs no lock. A
/// subscriber is a member iff its registration was processed and no
/// deregistration for it has been processed since.
#[derive(Debug, Default)]
pub(crate) struct SubscriberRegistry {
    subscribers: HashMap<SubscriberId, Sender<Event>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: HashMap::new(),
        }
    }

    /// Returns `false` if `id` was already registered, in which case the
    /// previous channel is replaced.
    pub(crate) fn register(&mut self, id: SubscriberId, sender: Sender<Event>) -> bool {
        self.subscribers.insert(id, sender).is_none()
    }

    /// Removing an absent subscriber is a no-op and returns `false`.
    pub(crate) fn unregister(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Iteration order is unspecified.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&SubscriberId, &Sender<Event>)> {
        self.subscribers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn subscriber_ids_are_unique() {
        assert_ne!(SubscriberId::new(), SubscriberId::new());
    }

    #[test]
    fn register_and_unregister() {
        let mut registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = SubscriberId::new();

        assert!(registry.register(id, tx));
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister(&id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn unregister_absent_subscriber_is_a_noop() {
        let mut registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let present = SubscriberId::new();
        registry.register(present, tx);

        assert!(!registry.unregister(&SubscriberId::new()));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(&present));
        assert!(!registry.unregister(&present));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn membership_is_by_identity_not_channel() {
        let mut registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::channel(1);

        registry.register(SubscriberId::new(), tx.clone());
        registry.register(SubscriberId::new(), tx);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.iter().count(), 2);
    }
}
