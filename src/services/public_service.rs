//! Service helpers that expose read-only public projections of an event queue.

use uuid::Uuid;

use crate::{
    dao::models::EventEntity,
    dto::{
        event::PublicEventHeader,
        queue::{PublicQueueResponse, QueueRowView, ReceiptQuery, ReceiptResponse},
    },
    error::ServiceError,
    services::event_service,
    state::{
        SharedState,
        projection::{QueueRow, locate_receipt, project_queue},
    },
};

/// Event header for a join code.
pub async fn event_header(
    state: &SharedState,
    event_code: &str,
) -> Result<PublicEventHeader, ServiceError> {
    let event = event_service::find_event_by_code(state, event_code).await?;
    Ok(PublicEventHeader::from(&event))
}

/// Public queue of the event addressed by a join code.
pub async fn public_queue(
    state: &SharedState,
    event_code: &str,
) -> Result<PublicQueueResponse, ServiceError> {
    let event = event_service::find_event_by_code(state, event_code).await?;
    let rows = snapshot_rows(state, &event).await?;
    Ok(public_response(&event, &rows))
}

/// Rebuild the public queue of `event_id` from a fresh snapshot. `None` once
/// the event no longer exists.
pub async fn queue_for_event(
    state: &SharedState,
    event_id: Uuid,
) -> Result<Option<PublicQueueResponse>, ServiceError> {
    let store = state.require_event_store().await?;
    let Some(event) = store.find_event(event_id).await? else {
        return Ok(None);
    };
    let rows = snapshot_rows(state, &event).await?;
    Ok(Some(public_response(&event, &rows)))
}

/// Receipt for a submitter. A request that cannot be located yields a
/// receipt without a row rather than an error.
pub async fn receipt(
    state: &SharedState,
    query: &ReceiptQuery,
) -> Result<ReceiptResponse, ServiceError> {
    let event = event_service::find_event_by_code(state, &query.event_code).await?;
    let rows = snapshot_rows(state, &event).await?;
    let lookup = locate_receipt(
        &rows,
        query.parsed_request_id(),
        query.nickname.trim(),
        query.song_title.trim(),
    );
    Ok(ReceiptResponse::new(query, event.join_code.clone(), lookup))
}

async fn snapshot_rows(
    state: &SharedState,
    event: &EventEntity,
) -> Result<Vec<QueueRow>, ServiceError> {
    let store = state.require_event_store().await?;
    let requests = store.list_requests(event.id, None).await?;
    Ok(project_queue(&requests, event.song_minutes_avg))
}

fn public_response(event: &EventEntity, rows: &[QueueRow]) -> PublicQueueResponse {
    PublicQueueResponse {
        event: PublicEventHeader::from(event),
        rows: rows.iter().map(QueueRowView::from).collect(),
    }
}
