use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::dao::models::RequestStatus;

/// Change committed to an event or its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueChange {
    RequestAdded(Uuid),
    StatusChanged {
        request_id: Uuid,
        status: RequestStatus,
        demoted: Vec<Uuid>,
    },
    RequestsRemoved(Vec<Uuid>),
    /// Event header changed (gate toggled).
    EventUpdated,
    EventDeleted,
    /// The subscriber fell behind and must rebuild its view from a fresh snapshot.
    Resync,
}

/// Per-event registry of change observers.
#[derive(Clone)]
pub struct QueueFeed {
    channels: Arc<DashMap<Uuid, broadcast::Sender<QueueChange>>>,
    capacity: usize,
}

impl QueueFeed {
    /// Create a feed whose per-event channels buffer `capacity` notices.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register an observer for `event_id`. Dropping or cancelling the handle unregisters it.
    pub fn subscribe(&self, event_id: Uuid) -> QueueSubscription {
        let receiver = self
            .channels
            .entry(event_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        QueueSubscription {
            event_id,
            receiver: Some(receiver),
            channels: Arc::clone(&self.channels),
        }
    }

    /// Notify every observer of `event_id`. Events nobody watches are skipped.
    pub fn publish(&self, event_id: Uuid, change: QueueChange) {
        if let Some(sender) = self.channels.get(&event_id) {
            let _ = sender.send(change);
        }
    }

    /// Number of observers currently registered for `event_id`.
    pub fn observer_count(&self, event_id: Uuid) -> usize {
        self.channels
            .get(&event_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

/// Cancellation handle returned by [`QueueFeed::subscribe`].
pub struct QueueSubscription {
    event_id: Uuid,
    receiver: Option<broadcast::Receiver<QueueChange>>,
    channels: Arc<DashMap<Uuid, broadcast::Sender<QueueChange>>>,
}

impl QueueSubscription {
    /// Event this subscription observes.
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Wait for the next change. Returns `None` once cancelled.
    ///
    /// Missed notices collapse into a single [`QueueChange::Resync`].
    pub async fn recv(&mut self) -> Option<QueueChange> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(change) => Some(change),
            Err(RecvError::Lagged(_)) => Some(QueueChange::Resync),
            Err(RecvError::Closed) => None,
        }
    }

    /// Stop observing the event.
    pub fn cancel(&mut self) {
        if self.receiver.take().is_some() {
            // The receiver is gone, so an otherwise idle channel has no receivers left.
            self.channels
                .remove_if(&self.event_id, |_, sender| sender.receiver_count() == 0);
        }
    }
}

impl Drop for QueueSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn observers_only_see_their_event() {
        let feed = QueueFeed::new(8);
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut subscription = feed.subscribe(watched);
        let _other_subscription = feed.subscribe(other);

        let request_id = Uuid::new_v4();
        feed.publish(other, QueueChange::EventUpdated);
        feed.publish(watched, QueueChange::RequestAdded(request_id));

        assert_eq!(
            subscription.recv().await,
            Some(QueueChange::RequestAdded(request_id))
        );
    }

    #[tokio::test]
    async fn cancel_unregisters_the_observer() {
        let feed = QueueFeed::new(8);
        let event_id = Uuid::new_v4();
        let mut first = feed.subscribe(event_id);
        let second = feed.subscribe(event_id);
        assert_eq!(feed.observer_count(event_id), 2);

        first.cancel();
        assert_eq!(feed.observer_count(event_id), 1);
        assert_eq!(first.recv().await, None);

        drop(second);
        assert_eq!(feed.observer_count(event_id), 0);
    }

    #[tokio::test]
    async fn lagging_observer_is_asked_to_resync() {
        let feed = QueueFeed::new(1);
        let event_id = Uuid::new_v4();
        let mut subscription = feed.subscribe(event_id);

        feed.publish(event_id, QueueChange::EventUpdated);
        feed.publish(event_id, QueueChange::EventUpdated);
        feed.publish(event_id, QueueChange::EventDeleted);

        assert_eq!(subscription.recv().await, Some(QueueChange::Resync));
        assert_eq!(subscription.recv().await, Some(QueueChange::EventDeleted));
    }
}
