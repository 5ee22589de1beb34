use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::EventEntity,
    dto::sse::{
        EventDeletedEvent, EventUpsertedEvent, QueueChangedEvent, ServerEvent, SystemStatus,
    },
    state::{QueueChange, SharedState},
};

const EVENT_UPSERTED: &str = "event.upserted";
const EVENT_DELETED: &str = "event.deleted";
const EVENT_QUEUE_CHANGED: &str = "queue.changed";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Tell operators an event was created or its gate toggled, and refresh open queue views.
pub fn broadcast_event_upserted(state: &SharedState, event: &EventEntity) {
    let payload = EventUpsertedEvent(event.clone().into());
    send_admin_event(state, EVENT_UPSERTED, &payload);
    state
        .queue_feed()
        .publish(event.id, QueueChange::EventUpdated);
}

/// Tell operators and queue viewers that an event is gone.
pub fn broadcast_event_deleted(state: &SharedState, event_id: Uuid) {
    send_admin_event(state, EVENT_DELETED, &EventDeletedEvent { id: event_id });
    state
        .queue_feed()
        .publish(event_id, QueueChange::EventDeleted);
}

/// Publish a committed queue mutation to the per-event feed and the operator stream.
pub fn broadcast_queue_change(state: &SharedState, event_id: Uuid, change: QueueChange) {
    let summary = match &change {
        QueueChange::RequestAdded(id) => Some(("request_added", vec![*id])),
        QueueChange::StatusChanged {
            request_id,
            demoted,
            ..
        } => Some((
            "status_changed",
            std::iter::once(*request_id)
                .chain(demoted.iter().copied())
                .collect(),
        )),
        QueueChange::RequestsRemoved(ids) => Some(("requests_removed", ids.clone())),
        QueueChange::EventUpdated | QueueChange::EventDeleted | QueueChange::Resync => None,
    };

    if let Some((kind, request_ids)) = summary {
        let payload = QueueChangedEvent {
            event_id,
            change: kind.to_owned(),
            request_ids,
        };
        send_admin_event(state, EVENT_QUEUE_CHANGED, &payload);
    }

    state.queue_feed().publish(event_id, change);
}

/// Broadcast a degraded mode transition to operators.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_admin_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_admin_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.admin_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize admin SSE payload"),
    }
}
