use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database,
    bson::doc,
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        EVENT_COLLECTION_NAME, MongoEventDocument, MongoRequestDocument, REQUEST_COLLECTION_NAME,
        doc_id, request_filter,
    },
};
use crate::dao::{
    clock::ServerClock,
    event_store::{EventStore, MAX_BATCH_OPERATIONS},
    models::{BatchOp, EventEntity, NewEvent, NewRequest, RequestEntity, RequestStatus},
    storage::{StorageError, StorageResult},
};

#[derive(Clone)]
pub struct MongoEventStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
    clock: ServerClock,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// Outcome of applying a batch inside an open transaction.
enum BatchOutcome {
    Applied,
    Missing(Uuid),
}

impl MongoEventStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
            clock: ServerClock::new(),
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let events = self.events().await;
        let code_index = mongodb::IndexModel::builder()
            .keys(doc! {"join_code": 1, "is_active": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("event_join_code_idx".to_owned()))
                    .build(),
            )
            .build();
        events
            .create_index(code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: EVENT_COLLECTION_NAME,
                index: "join_code,is_active",
                source,
            })?;

        let requests = self.requests().await;
        let order_index = mongodb::IndexModel::builder()
            .keys(doc! {"event_id": 1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("request_event_order_idx".to_owned()))
                    .build(),
            )
            .build();
        requests
            .create_index(order_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: REQUEST_COLLECTION_NAME,
                index: "event_id,created_at",
                source,
            })?;

        Ok(())
    }

    async fn events(&self) -> Collection<MongoEventDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoEventDocument>(EVENT_COLLECTION_NAME)
    }

    async fn requests(&self) -> Collection<MongoRequestDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRequestDocument>(REQUEST_COLLECTION_NAME)
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn insert_event(&self, event: NewEvent) -> MongoResult<EventEntity> {
        let entity = EventEntity {
            id: Uuid::new_v4(),
            name: event.name,
            join_code: event.join_code,
            is_active: true,
            accepting_requests: true,
            song_minutes_avg: event.song_minutes_avg,
            created_at: self.inner.clock.now(),
        };
        let document = MongoEventDocument::from(entity.clone());
        self.events()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::SaveEvent {
                id: entity.id,
                source,
            })?;
        Ok(entity)
    }

    async fn find_event(&self, id: Uuid) -> MongoResult<Option<EventEntity>> {
        let document = self
            .events()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadEvent { id, source })?;
        document.map(EventEntity::try_from).transpose()
    }

    async fn find_events(
        &self,
        filter: mongodb::bson::Document,
        newest_first: bool,
    ) -> MongoResult<Vec<EventEntity>> {
        let direction = if newest_first { -1 } else { 1 };
        let documents: Vec<MongoEventDocument> = self
            .events()
            .await
            .find(filter)
            .sort(doc! {"created_at": direction})
            .await
            .map_err(|source| MongoDaoError::ListEvents { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListEvents { source })?;

        documents.into_iter().map(EventEntity::try_from).collect()
    }

    async fn toggle_accepting(&self, id: Uuid) -> MongoResult<Option<EventEntity>> {
        // Pipeline update so the flip happens server side; a missing flag reads as open.
        let flip = vec![doc! {
            "$set": {
                "accepting_requests": {
                    "$not": [{ "$ifNull": ["$accepting_requests", true] }]
                }
            }
        }];
        let document = self
            .events()
            .await
            .find_one_and_update(doc_id(id), flip)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::SaveEvent { id, source })?;
        document.map(EventEntity::try_from).transpose()
    }

    async fn delete_event(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .events()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::DeleteEvent { id, source })?;

        // Requests committed after the caller drained the event.
        let swept = self
            .requests()
            .await
            .delete_many(doc! {"event_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::DeleteEvent { id, source })?;
        if swept.deleted_count > 0 {
            warn!(event_id = %id, swept = swept.deleted_count, "removed requests left behind by event deletion");
        }
        Ok(result.deleted_count > 0)
    }

    /// Insert a request in a transaction that also writes its event document,
    /// so a concurrent event deletion either conflicts or sees the request.
    async fn insert_request(
        &self,
        event_id: Uuid,
        request: NewRequest,
    ) -> StorageResult<RequestEntity> {
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
        let request_id = entity.id;
        let save_error = |source| MongoDaoError::SaveRequest {
            id: request_id,
            source,
        };
        let document = MongoRequestDocument::from(entity.clone());

        let mut session = self
            .client()
            .await
            .start_session()
            .await
            .map_err(save_error)?;
        session.start_transaction().await.map_err(save_error)?;

        let touched = self
            .events()
            .await
            .update_one(
                doc_id(event_id),
                doc! {"$set": {"last_request_at": document.created_at}},
            )
            .session(&mut session)
            .await;
        match touched {
            Ok(result) if result.matched_count == 0 => {
                abort(&mut session, event_id).await;
                return Err(StorageError::MissingDocument {
                    collection: EVENT_COLLECTION_NAME,
                    id: event_id,
                });
            }
            Ok(_) => {}
            Err(source) => {
                abort(&mut session, event_id).await;
                return Err(save_error(source).into());
            }
        }

        if let Err(source) = self
            .requests()
            .await
            .insert_one(&document)
            .session(&mut session)
            .await
        {
            abort(&mut session, event_id).await;
            return Err(save_error(source).into());
        }

        session.commit_transaction().await.map_err(save_error)?;
        Ok(entity)
    }

    async fn list_requests(
        &self,
        event_id: Uuid,
        limit: Option<usize>,
    ) -> MongoResult<Vec<RequestEntity>> {
        let collection = self.requests().await;
        let mut find = collection
            .find(doc! {"event_id": event_id.to_string()})
            .sort(doc! {"created_at": 1});
        if let Some(limit) = limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let documents: Vec<MongoRequestDocument> = find
            .await
            .map_err(|source| MongoDaoError::ListRequests { event_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRequests { event_id, source })?;

        documents.into_iter().map(RequestEntity::try_from).collect()
    }

    async fn commit_batch(&self, event_id: Uuid, operations: Vec<BatchOp>) -> StorageResult<()> {
        if operations.len() > MAX_BATCH_OPERATIONS {
            return Err(StorageError::BatchTooLarge {
                size: operations.len(),
                limit: MAX_BATCH_OPERATIONS,
            });
        }
        if operations.is_empty() {
            return Ok(());
        }

        let batch_error = |source| MongoDaoError::Batch { event_id, source };
        let mut session = self.client().await.start_session().await.map_err(batch_error)?;
        session.start_transaction().await.map_err(batch_error)?;

        match self.apply_batch(&mut session, event_id, &operations).await {
            Ok(BatchOutcome::Applied) => {
                session.commit_transaction().await.map_err(batch_error)?;
                Ok(())
            }
            Ok(BatchOutcome::Missing(id)) => {
                abort(&mut session, event_id).await;
                Err(StorageError::MissingDocument {
                    collection: REQUEST_COLLECTION_NAME,
                    id,
                })
            }
            Err(err) => {
                abort(&mut session, event_id).await;
                Err(err.into())
            }
        }
    }

    async fn apply_batch(
        &self,
        session: &mut ClientSession,
        event_id: Uuid,
        operations: &[BatchOp],
    ) -> MongoResult<BatchOutcome> {
        let collection = self.requests().await;
        let batch_error = |source| MongoDaoError::Batch { event_id, source };

        for op in operations {
            match *op {
                BatchOp::SetStatus { request_id, status } => {
                    let result = collection
                        .update_one(
                            request_filter(event_id, request_id),
                            doc! {"$set": {"status": status.as_str()}},
                        )
                        .session(&mut *session)
                        .await
                        .map_err(batch_error)?;
                    if result.matched_count == 0 {
                        return Ok(BatchOutcome::Missing(request_id));
                    }
                }
                BatchOp::Delete { request_id } => {
                    let result = collection
                        .delete_one(request_filter(event_id, request_id))
                        .session(&mut *session)
                        .await
                        .map_err(batch_error)?;
                    if result.deleted_count == 0 {
                        return Ok(BatchOutcome::Missing(request_id));
                    }
                }
            }
        }

        Ok(BatchOutcome::Applied)
    }
}

async fn abort(session: &mut ClientSession, event_id: Uuid) {
    if let Err(err) = session.abort_transaction().await {
        warn!(%event_id, error = %err, "failed to abort request batch transaction");
    }
}

impl EventStore for MongoEventStore {
    fn insert_event(&self, event: NewEvent) -> BoxFuture<'static, StorageResult<EventEntity>> {
        let store = self.clone();
        Box::pin(async move { store.insert_event(event).await.map_err(Into::into) })
    }

    fn find_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_event(id).await.map_err(Into::into) })
    }

    fn find_active_events_by_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_events(doc! {"join_code": join_code, "is_active": true}, false)
                .await
                .map_err(Into::into)
        })
    }

    fn list_events(&self) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_events(doc! {}, true).await.map_err(Into::into) })
    }

    fn toggle_accepting(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.toggle_accepting(id).await.map_err(Into::into) })
    }

    fn delete_event(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_event(id).await.map_err(Into::into) })
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
            store
                .list_requests(event_id, limit)
                .await
                .map_err(Into::into)
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
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
