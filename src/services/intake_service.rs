//! Request intake for attendees (gated) and the operator (ungated).

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{NewRequest, RequestEntity, RequestOrigin},
    dto::request::{
        OperatorRequestPayload, RequestSummary, SubmissionConfirmation, SubmitRequestPayload,
    },
    error::ServiceError,
    services::{event_service, sse_events},
    state::{QueueChange, SharedState},
};

/// Nickname recorded when the operator adds a song without naming a singer.
pub const OPERATOR_DEFAULT_NICKNAME: &str = "REGIA";

/// Append an attendee request to the event addressed by `event_code`.
///
/// A closed gate rejects the submission before the fields are even looked at.
pub async fn submit_request(
    state: &SharedState,
    event_code: &str,
    payload: SubmitRequestPayload,
) -> Result<SubmissionConfirmation, ServiceError> {
    let event = event_service::find_event_by_code(state, event_code).await?;
    if !event.accepting_requests {
        return Err(ServiceError::SubmissionsClosed);
    }

    let payload = payload.trimmed();
    payload.validate()?;

    let request = insert_under_gate(
        state,
        event.id,
        NewRequest {
            nickname: payload.nickname,
            song_title: payload.song_title,
            key_shift: key_shift(payload.key_shift),
            created_by: RequestOrigin::Attendee,
        },
    )
    .await?;

    info!(event_id = %event.id, request_id = %request.id, "request submitted");
    sse_events::broadcast_queue_change(state, event.id, QueueChange::RequestAdded(request.id));

    Ok(SubmissionConfirmation {
        event_code: event.join_code,
        nickname: request.nickname.clone(),
        song_title: request.song_title.clone(),
        request_id: request.id,
        request: request.into(),
    })
}

/// Insert a request on behalf of the operator, regardless of the gate.
pub async fn insert_operator_request(
    state: &SharedState,
    event_id: Uuid,
    payload: OperatorRequestPayload,
) -> Result<RequestSummary, ServiceError> {
    let nickname = payload
        .nickname
        .as_deref()
        .map(str::trim)
        .filter(|nickname| !nickname.is_empty())
        .unwrap_or(OPERATOR_DEFAULT_NICKNAME)
        .to_owned();
    let payload = OperatorRequestPayload {
        nickname: Some(nickname),
        song_title: payload.song_title.trim().to_owned(),
        key_shift: payload.key_shift,
    };
    payload.validate()?;

    let request = insert_under_gate(
        state,
        event_id,
        NewRequest {
            nickname: payload.nickname.unwrap_or_default(),
            song_title: payload.song_title,
            key_shift: key_shift(payload.key_shift),
            created_by: RequestOrigin::Operator,
        },
    )
    .await?;

    info!(%event_id, request_id = %request.id, "operator request inserted");
    sse_events::broadcast_queue_change(state, event_id, QueueChange::RequestAdded(request.id));
    Ok(request.into())
}

/// Append a request while holding the status gate, after confirming the event
/// still exists. Cascade deletion holds the same gate while it drains the event.
async fn insert_under_gate(
    state: &SharedState,
    event_id: Uuid,
    request: NewRequest,
) -> Result<RequestEntity, ServiceError> {
    let store = state.require_event_store().await?;
    let _gate = state.lock_status_gate().await;
    event_service::load_event(state, event_id).await?;
    Ok(store.insert_request(event_id, request).await?)
}

// Range already checked by validation.
fn key_shift(value: i32) -> i8 {
    value.clamp(-3, 3) as i8
}
