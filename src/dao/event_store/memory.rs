//! In-process implementation of [`EventStore`], used when no database is
//! configured and by the test suites.

use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventStore, MAX_BATCH_OPERATIONS};
use crate::dao::{
    clock::ServerClock,
    models::{BatchOp, EventEntity, NewEvent, NewRequest, RequestEntity, RequestStatus},
    storage::{StorageError, StorageResult},
};

const REQUEST_COLLECTION: &str = "requests";

/// Store keeping every document behind a single lock, which makes each batch
/// trivially atomic with respect to concurrent readers.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    clock: ServerClock,
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    /// Insertion order equals creation order.
    events: IndexMap<Uuid, EventEntity>,
    /// Requests keyed by owning event, in arrival order.
    requests: HashMap<Uuid, IndexMap<Uuid, RequestEntity>>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_event(&self, event: NewEvent) -> EventEntity {
        let mut state = self.inner.state.write().await;
        let entity = EventEntity {
            id: Uuid::new_v4(),
            name: event.name,
            join_code: event.join_code,
            is_active: true,
            accepting_requests: true,
            song_minutes_avg: event.song_minutes_avg,
            created_at: self.inner.clock.now(),
        };
        state.events.insert(entity.id, entity.clone());
        entity
    }

    async fn insert_request(
        &self,
        event_id: Uuid,
        request: NewRequest,
    ) -> StorageResult<RequestEntity> {
        let mut state = self.inner.state.write().await;
        if !state.events.contains_key(&event_id) {
            return Err(StorageError::MissingDocument {
                collection: "events",
                id: event_id,
            });
        }

        let entity = RequestEntity {
            id: Uuid::new_v4(),
            event_id,
            nickname: request.nickname,
            song_title: request.song_title,
            key_shift: request.key_shift,
            status: RequestStatus::Waiting,
            created_at: self.inner.clock.now(),
            created_by: Some(request.created_by),
        };
        state
            .requests
            .entry(event_id)
            .or_default()
            .insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn commit_batch(&self, event_id: Uuid, operations: Vec<BatchOp>) -> StorageResult<()> {
        if operations.len() > MAX_BATCH_OPERATIONS {
            return Err(StorageError::BatchTooLarge {
                size: operations.len(),
                limit: MAX_BATCH_OPERATIONS,
            });
        }

        let mut state = self.inner.state.write().await;
        let Some(requests) = state.requests.get_mut(&event_id) else {
            return match operations.first() {
                Some(op) => Err(StorageError::MissingDocument {
                    collection: REQUEST_COLLECTION,
                    id: op.request_id(),
                }),
                None => Ok(()),
            };
        };

        // Validate the whole batch against a staged copy before touching the live map.
        let mut staged = requests.clone();
        for op in &operations {
            match *op {
                BatchOp::SetStatus { request_id, status } => {
                    let request = staged.get_mut(&request_id).ok_or(
                        StorageError::MissingDocument {
                            collection: REQUEST_COLLECTION,
                            id: request_id,
                        },
                    )?;
                    request.status = status;
                }
                BatchOp::Delete { request_id } => {
                    staged
                        .shift_remove(&request_id)
                        .ok_or(StorageError::MissingDocument {
                            collection: REQUEST_COLLECTION,
                            id: request_id,
                        })?;
                }
            }
        }

        *requests = staged;
        Ok(())
    }
}

impl EventStore for InMemoryEventStore {
    fn insert_event(&self, event: NewEvent) -> BoxFuture<'static, StorageResult<EventEntity>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.insert_event(event).await) })
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.inner.state.read().await;
            Ok(state.events.get(&id).cloned())
        })
    }

    fn find_active_events_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.inner.state.read().await;
            Ok(state
                .events
                .values()
                .filter(|event| event.is_active && event.join_code == join_code)
                .cloned()
                .collect())
        })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.inner.state.read().await;
            Ok(state.events.values().rev().cloned().collect())
        })
    }

    fn toggle_accepting(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut state = store.inner.state.write().await;
            Ok(state.events.get_mut(&id).map(|event| {
                event.accepting_requests = !event.accepting_requests;
                event.clone()
            }))
        })
    }

    fn delete_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut state = store.inner.state.write().await;
            let existed = state.events.shift_remove(&id).is_some();
            // Children are removed by the caller in batches; drop the empty bucket.
            if state.requests.get(&id).is_some_and(IndexMap::is_empty) {
                state.requests.remove(&id);
            }
            Ok(existed)
        })
    }

    fn insert_request(
        &self,
        event_id: Uuid,
        request: NewRequest,
    ) -> BoxFuture<'static, StorageResult<RequestEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_request(event_id, request).await })
    }

    fn list_requests(
        &self,
        event_id: Uuid,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<RequestEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.inner.state.read().await;
            let Some(requests) = state.requests.get(&event_id) else {
                return Ok(Vec::new());
            };
            let mut ordered: Vec<RequestEntity> = requests.values().cloned().collect();
            ordered.sort_by_key(|request| request.created_at);
            if let Some(limit) = limit {
                ordered.truncate(limit);
            }
            Ok(ordered)
        })
    }

    fn commit_batch(
        &self,
        event_id: Uuid,
        operations: Vec<BatchOp>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.commit_batch(event_id, operations).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
