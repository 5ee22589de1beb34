//! Operator queue mutations. Every mutation is planned against one snapshot
//! and committed as a single atomic batch while holding the status gate.

use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::{BatchOp, RequestStatus},
    dto::{
        event::EventSummary,
        queue::{OperatorQueueResponse, OperatorQueueRow},
        request::{DeleteResponse, StatusChangeOutcome, StatusChangeResponse},
    },
    error::ServiceError,
    services::{event_service, sse_events},
    state::{QueueChange, SharedState, projection::project_queue, queue_machine},
};

/// Move a request to `status`, demoting the previous holder of an exclusive status.
///
/// A blank, malformed or unknown event id is not an error: nothing is written
/// and the outcome reports that no event is active.
pub async fn set_status(
    state: &SharedState,
    raw_event_id: &str,
    request_id: Uuid,
    status: RequestStatus,
) -> Result<StatusChangeResponse, ServiceError> {
    let Ok(event_id) = Uuid::parse_str(raw_event_id.trim()) else {
        debug!(raw_event_id, "status change without an active event");
        return Ok(StatusChangeResponse::no_active_event());
    };

    let store = state.require_event_store().await?;
    let _gate = state.lock_status_gate().await;

    if store.find_event(event_id).await?.is_none() {
        debug!(%event_id, "status change on unknown event");
        return Ok(StatusChangeResponse::no_active_event());
    }

    let snapshot = store.list_requests(event_id, None).await?;
    let plan = queue_machine::plan_status_change(&snapshot, request_id, status)?;
    store.commit_batch(event_id, plan.operations()).await?;

    info!(
        %event_id,
        %request_id,
        from = plan.from.as_str(),
        to = plan.to.as_str(),
        demoted = plan.demoted.len(),
        "request status changed"
    );
    sse_events::broadcast_queue_change(
        state,
        event_id,
        QueueChange::StatusChanged {
            request_id,
            status,
            demoted: plan.demoted.clone(),
        },
    );

    Ok(StatusChangeResponse {
        outcome: StatusChangeOutcome::Applied,
        request_id: Some(request_id),
        status: Some(status),
        demoted: plan.demoted,
    })
}

/// Remove a single request.
pub async fn delete_request(
    state: &SharedState,
    event_id: Uuid,
    request_id: Uuid,
) -> Result<DeleteResponse, ServiceError> {
    bulk_delete(state, event_id, vec![request_id]).await
}

/// Remove every selected request in one atomic batch. An unknown id aborts
/// the whole batch; an empty selection writes nothing.
pub async fn bulk_delete(
    state: &SharedState,
    event_id: Uuid,
    request_ids: Vec<Uuid>,
) -> Result<DeleteResponse, ServiceError> {
    event_service::load_event(state, event_id).await?;

    let mut seen = HashSet::new();
    let request_ids: Vec<Uuid> = request_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();
    if request_ids.is_empty() {
        return Ok(DeleteResponse { deleted: 0 });
    }

    let store = state.require_event_store().await?;
    let operations = request_ids
        .iter()
        .map(|&request_id| BatchOp::Delete { request_id })
        .collect();
    {
        let _gate = state.lock_status_gate().await;
        store.commit_batch(event_id, operations).await?;
    }

    info!(%event_id, deleted = request_ids.len(), "requests deleted");
    let deleted = request_ids.len();
    sse_events::broadcast_queue_change(
        state,
        event_id,
        QueueChange::RequestsRemoved(request_ids),
    );
    Ok(DeleteResponse { deleted })
}

/// Operator console view: event header plus every row with provenance.
pub async fn operator_queue(
    state: &SharedState,
    event_id: Uuid,
) -> Result<OperatorQueueResponse, ServiceError> {
    let event = event_service::load_event(state, event_id).await?;
    let store = state.require_event_store().await?;
    let requests = store.list_requests(event_id, None).await?;

    let rows = project_queue(&requests, event.song_minutes_avg);
    Ok(OperatorQueueResponse {
        request_count: rows.len(),
        rows: rows.iter().map(OperatorQueueRow::from).collect(),
        event: EventSummary::from(event),
    })
}
