//! Event registry: creation with join codes, lookup, the submission gate and
//! cascade deletion.

use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{BatchOp, EventEntity, NewEvent},
    dto::{
        event::{CreateEventRequest, EventSummary},
        request::DeleteResponse,
        validation::{JOIN_CODE_LEN, validate_join_code},
    },
    error::ServiceError,
    services::sse_events,
    state::{QueueChange, SharedState},
};

const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw a six character uppercase alphanumeric join code.
pub fn generate_join_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trim and upper-case a join code typed by an attendee.
pub fn normalize_join_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Open a new event with a fresh join code and the gate open.
pub async fn create_event(
    state: &SharedState,
    request: CreateEventRequest,
) -> Result<EventSummary, ServiceError> {
    let store = state.require_event_store().await?;

    let attempts = state.config().join_code_attempts();
    let mut join_code = generate_join_code(&mut rand::rng());
    for attempt in 1..=attempts {
        if store
            .find_active_events_by_code(join_code.clone())
            .await?
            .is_empty()
        {
            break;
        }
        if attempt == attempts {
            warn!(%join_code, attempts, "join code still collides; keeping last candidate");
            break;
        }
        debug!(%join_code, attempt, "join code already in use; drawing another");
        join_code = generate_join_code(&mut rand::rng());
    }

    let song_minutes_avg = request
        .song_minutes_avg
        .unwrap_or_else(|| state.config().default_song_minutes());
    let event = store
        .insert_event(NewEvent {
            name: request.name.trim().to_owned(),
            join_code,
            song_minutes_avg: Some(song_minutes_avg),
        })
        .await?;

    info!(event_id = %event.id, join_code = %event.join_code, "event created");
    sse_events::broadcast_event_upserted(state, &event);
    Ok(event.into())
}

/// Event history, newest first.
pub async fn list_events(state: &SharedState) -> Result<Vec<EventSummary>, ServiceError> {
    let store = state.require_event_store().await?;
    let events = store.list_events().await?;
    Ok(events.into_iter().map(EventSummary::from).collect())
}

/// Load one event or fail with `NotFound`.
pub async fn load_event(state: &SharedState, event_id: Uuid) -> Result<EventEntity, ServiceError> {
    let store = state.require_event_store().await?;
    store
        .find_event(event_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event `{event_id}` not found")))
}

/// Operator view of a single event.
pub async fn get_event(state: &SharedState, event_id: Uuid) -> Result<EventSummary, ServiceError> {
    load_event(state, event_id).await.map(Into::into)
}

/// Resolve the active event addressed by a join code. When several active
/// events share the code, the oldest wins.
pub async fn find_event_by_code(
    state: &SharedState,
    raw_code: &str,
) -> Result<EventEntity, ServiceError> {
    let code = normalize_join_code(raw_code);
    let not_found = || ServiceError::NotFound(format!("no active event with code `{code}`"));
    if validate_join_code(&code).is_err() {
        return Err(not_found());
    }

    let store = state.require_event_store().await?;
    let mut matches = store.find_active_events_by_code(code.clone()).await?;
    if matches.len() > 1 {
        warn!(%code, count = matches.len(), "several active events share a join code");
    }
    if matches.is_empty() {
        return Err(not_found());
    }
    Ok(matches.swap_remove(0))
}

/// Flip the attendee submission gate.
pub async fn toggle_accepting(
    state: &SharedState,
    event_id: Uuid,
) -> Result<EventSummary, ServiceError> {
    let store = state.require_event_store().await?;
    let event = store
        .toggle_accepting(event_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("event `{event_id}` not found")))?;

    info!(%event_id, accepting = event.accepting_requests, "submission gate toggled");
    sse_events::broadcast_event_upserted(state, &event);
    Ok(event.into())
}

/// Delete an event after removing its requests in bounded batches.
pub async fn delete_event(
    state: &SharedState,
    event_id: Uuid,
) -> Result<DeleteResponse, ServiceError> {
    let store = state.require_event_store().await?;
    load_event(state, event_id).await?;

    let batch_size = state.config().cascade_batch_size();
    let mut deleted = 0;
    {
        let _gate = state.lock_status_gate().await;
        loop {
            let chunk = store.list_requests(event_id, Some(batch_size)).await?;
            if chunk.is_empty() {
                break;
            }
            let ids: Vec<Uuid> = chunk.iter().map(|request| request.id).collect();
            let operations = ids
                .iter()
                .map(|&request_id| BatchOp::Delete { request_id })
                .collect();
            store.commit_batch(event_id, operations).await?;
            deleted += ids.len();
            debug!(%event_id, batch = ids.len(), "deleted request batch");
            sse_events::broadcast_queue_change(state, event_id, QueueChange::RequestsRemoved(ids));
        }

        if !store.delete_event(event_id).await? {
            return Err(ServiceError::NotFound(format!(
                "event `{event_id}` not found"
            )));
        }
    }

    info!(%event_id, requests = deleted, "event deleted");
    sse_events::broadcast_event_deleted(state, event_id);
    Ok(DeleteResponse { deleted })
}
