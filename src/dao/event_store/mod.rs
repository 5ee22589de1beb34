pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{BatchOp, EventEntity, NewEvent, NewRequest, RequestEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Maximum number of writes a single atomic batch may carry.
pub const MAX_BATCH_OPERATIONS: usize = 500;

/// Abstraction over the ordered document store holding events and their requests.
pub trait EventStore: Send + Sync {
    /// Insert an event; the store assigns id, timestamp and the default flags.
    fn insert_event(&self, event: NewEvent) -> BoxFuture<'static, StorageResult<EventEntity>>;
    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>>;
    /// Active events carrying `join_code`, oldest first.
    fn find_active_events_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>>;
    /// Every event, newest first.
    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>>;
    /// Atomically flip the submission gate. Returns `None` for unknown events.
    fn toggle_accepting(&self, id: Uuid)
    -> BoxFuture<'static, StorageResult<Option<EventEntity>>>;
    /// Delete the event document only. Returns whether it existed.
    fn delete_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Insert a `WAITING` request under `event_id`.
    fn insert_request(
        &self,
        event_id: Uuid,
        request: NewRequest,
    ) -> BoxFuture<'static, StorageResult<RequestEntity>>;
    /// Requests of an event in arrival order, optionally truncated to `limit`.
    fn list_requests(
        &self,
        event_id: Uuid,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<RequestEntity>>>;
    /// Apply every operation or none of them.
    fn commit_batch(
        &self,
        event_id: Uuid,
        operations: Vec<BatchOp>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
