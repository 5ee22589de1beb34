use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::{
    clock::{from_micros, to_micros},
    models::{EventEntity, RequestEntity, RequestOrigin, RequestStatus},
};

pub const EVENT_COLLECTION_NAME: &str = "events";
pub const REQUEST_COLLECTION_NAME: &str = "requests";

fn default_true() -> bool {
    true
}

/// Persisted shape of an event. Older documents may lack the gate flag or
/// carry a non-numeric average, both of which are tolerated on read.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEventDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub join_code: String,
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub accepting_requests: bool,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub song_minutes_avg: Option<f64>,
    /// Microseconds since the Unix epoch.
    pub created_at: i64,
}

impl From<EventEntity> for MongoEventDocument {
    fn from(value: EventEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            join_code: value.join_code,
            is_active: value.is_active,
            accepting_requests: value.accepting_requests,
            song_minutes_avg: value.song_minutes_avg,
            created_at: to_micros(value.created_at),
        }
    }
}

impl TryFrom<MongoEventDocument> for EventEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoEventDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(EVENT_COLLECTION_NAME, &value.id)?,
            name: value.name,
            join_code: value.join_code,
            is_active: value.is_active,
            accepting_requests: value.accepting_requests,
            song_minutes_avg: value.song_minutes_avg,
            created_at: from_micros(value.created_at),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRequestDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub event_id: String,
    pub nickname: String,
    pub song_title: String,
    #[serde(default)]
    pub key_shift: i32,
    pub status: RequestStatus,
    /// Microseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RequestOrigin>,
}

impl From<RequestEntity> for MongoRequestDocument {
    fn from(value: RequestEntity) -> Self {
        Self {
            id: value.id.to_string(),
            event_id: value.event_id.to_string(),
            nickname: value.nickname,
            song_title: value.song_title,
            key_shift: i32::from(value.key_shift),
            status: value.status,
            created_at: to_micros(value.created_at),
            created_by: value.created_by,
        }
    }
}

impl TryFrom<MongoRequestDocument> for RequestEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoRequestDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_id(REQUEST_COLLECTION_NAME, &value.id)?,
            event_id: parse_id(REQUEST_COLLECTION_NAME, &value.event_id)?,
            nickname: value.nickname,
            song_title: value.song_title,
            key_shift: value.key_shift.clamp(i8::MIN.into(), i8::MAX.into()) as i8,
            status: value.status,
            created_at: from_micros(value.created_at),
            created_by: value.created_by,
        })
    }
}

fn parse_id(collection: &'static str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|source| MongoDaoError::InvalidDocument {
        collection,
        id: raw.to_owned(),
        source,
    })
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching a request only inside its owning event.
pub fn request_filter(event_id: Uuid, request_id: Uuid) -> Document {
    doc! {"_id": request_id.to_string(), "event_id": event_id.to_string()}
}
