pub mod feed;
pub mod projection;
pub mod queue_machine;
mod sse;
pub mod wait;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, watch};

use crate::{config::AppConfig, dao::event_store::EventStore, error::ServiceError};

pub use self::feed::{QueueChange, QueueFeed, QueueSubscription};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

const ADMIN_SSE_CAPACITY: usize = 32;
const QUEUE_FEED_CAPACITY: usize = 32;

/// Central application state holding the storage handle, live-update hubs and
/// the status gate.
pub struct AppState {
    event_store: RwLock<Option<Arc<dyn EventStore>>>,
    config: Arc<AppConfig>,
    admin_sse: SseHub,
    queue_feed: QueueFeed,
    degraded: watch::Sender<bool>,
    status_gate: Mutex<()>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            event_store: RwLock::new(None),
            config: Arc::new(config),
            admin_sse: SseHub::new(ADMIN_SSE_CAPACITY),
            queue_feed: QueueFeed::new(QUEUE_FEED_CAPACITY),
            degraded: degraded_tx,
            status_gate: Mutex::new(()),
        })
    }

    /// Obtain a handle to the current event store, if one is installed.
    pub async fn event_store(&self) -> Option<Arc<dyn EventStore>> {
        let guard = self.event_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current event store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_event_store(&self) -> Result<Arc<dyn EventStore>, ServiceError> {
        self.event_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new event store implementation and leave degraded mode.
    pub async fn install_event_store(&self, store: Arc<dyn EventStore>) {
        {
            let mut guard = self.event_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current event store and enter degraded mode.
    pub async fn clear_event_store(&self) {
        {
            let mut guard = self.event_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.event_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Broadcast hub used for the operator SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        &self.admin_sse
    }

    /// Per-event change notifications feeding the live queue views.
    pub fn queue_feed(&self) -> &QueueFeed {
        &self.queue_feed
    }

    /// Serialize the read-plan-commit sequence of status changes.
    pub async fn lock_status_gate(&self) -> MutexGuard<'_, ()> {
        self.status_gate.lock().await
    }

    /// Broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
