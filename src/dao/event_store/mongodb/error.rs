use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("missing required environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save event `{id}`")]
    SaveEvent {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load event `{id}`")]
    LoadEvent {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list events")]
    ListEvents {
        #[source]
        source: MongoError,
    },
    #[error("failed to delete event `{id}`")]
    DeleteEvent {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save request `{id}`")]
    SaveRequest {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list requests of event `{event_id}`")]
    ListRequests {
        event_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("request batch on event `{event_id}` failed")]
    Batch {
        event_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` in `{collection}` is malformed")]
    InvalidDocument {
        collection: &'static str,
        id: String,
        #[source]
        source: uuid::Error,
    },
}
