use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::event::EventSummary;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`queue` or `admin`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent on the queue stream once the watched event has been deleted.
#[serde(rename_all = "camelCase")]
pub struct EventClosedEvent {
    pub event_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Operator stream: an event was created or its gate toggled.
pub struct EventUpsertedEvent(pub EventSummary);

#[derive(Debug, Serialize, ToSchema)]
/// Operator stream: an event and its requests were deleted.
pub struct EventDeletedEvent {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Operator stream: the queue of an event changed and should be refetched.
pub struct QueueChangedEvent {
    pub event_id: Uuid,
    /// `request_added`, `status_changed` or `requests_removed`.
    pub change: String,
    /// Requests touched by the change.
    pub request_ids: Vec<Uuid>,
}
