use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a song request inside an event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Queued, waiting for its turn.
    Waiting,
    /// Called up as the next performer.
    Next,
    /// Currently performing.
    OnStage,
}

impl RequestStatus {
    /// Wire/persistence representation of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Waiting => "WAITING",
            RequestStatus::Next => "NEXT",
            RequestStatus::OnStage => "ON_STAGE",
        }
    }

    /// Human readable label shown next to a queue row.
    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Waiting => "Waiting",
            RequestStatus::Next => "Next",
            RequestStatus::OnStage => "On stage",
        }
    }

    /// Whether at most one request per event may hold this status.
    pub fn is_exclusive(self) -> bool {
        matches!(self, RequestStatus::Next | RequestStatus::OnStage)
    }
}

/// Who inserted a request. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    /// Submitted through the public submission form.
    Attendee,
    /// Inserted by the operator from the admin surface.
    Operator,
}

/// Karaoke event (one night) persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEntity {
    /// Identifier assigned by the store.
    pub id: Uuid,
    /// Display name of the night.
    pub name: String,
    /// Six character uppercase alphanumeric code used by attendees.
    pub join_code: String,
    /// False once the event is permanently retired.
    pub is_active: bool,
    /// Gate for attendee submissions.
    pub accepting_requests: bool,
    /// Configured average minutes per song, unresolved.
    pub song_minutes_avg: Option<f64>,
    /// Server-assigned creation timestamp.
    pub created_at: SystemTime,
}

/// Song request owned by exactly one event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestEntity {
    /// Identifier assigned by the store.
    pub id: Uuid,
    /// Owning event; never changes.
    pub event_id: Uuid,
    /// Display name of the singer.
    pub nickname: String,
    /// Requested song.
    pub song_title: String,
    /// Key transposition in semitones.
    pub key_shift: i8,
    /// Current queue status.
    pub status: RequestStatus,
    /// Server-assigned creation timestamp defining the arrival order.
    pub created_at: SystemTime,
    /// Origin marker, absent on legacy documents.
    pub created_by: Option<RequestOrigin>,
}

/// Fields supplied by the caller when inserting an event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub join_code: String,
    pub song_minutes_avg: Option<f64>,
}

/// Fields supplied by the caller when inserting a request. The store assigns
/// the identifier, the timestamp and the initial `WAITING` status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub nickname: String,
    pub song_title: String,
    pub key_shift: i8,
    pub created_by: RequestOrigin,
}

/// Single write inside an atomic request batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    /// Overwrite the status of a request.
    SetStatus {
        request_id: Uuid,
        status: RequestStatus,
    },
    /// Remove a request.
    Delete { request_id: Uuid },
}

impl BatchOp {
    /// Request targeted by this operation.
    pub fn request_id(&self) -> Uuid {
        match self {
            BatchOp::SetStatus { request_id, .. } | BatchOp::Delete { request_id } => *request_id,
        }
    }
}
