use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::{
        event::{EventCodeQuery, PublicEventHeader},
        queue::{PublicQueueResponse, ReceiptQuery, ReceiptResponse},
        request::{SubmissionConfirmation, SubmitRequestPayload},
    },
    error::AppError,
    services::{intake_service, public_service},
    state::SharedState,
};

/// Attendee endpoints addressed by join code.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/events/{code}", get(get_event_header))
        .route("/public/queue", get(get_queue))
        .route("/public/requests", post(submit_request))
        .route("/public/receipt", get(get_receipt))
}

#[utoipa::path(
    get,
    path = "/public/events/{code}",
    tag = "public",
    params(("code" = String, Path, description = "Join code, case-insensitive")),
    responses(
        (status = 200, description = "Event header", body = PublicEventHeader),
        (status = 404, description = "No active event with this code")
    )
)]
/// Resolve a join code to the event it addresses.
pub async fn get_event_header(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<PublicEventHeader>, AppError> {
    Ok(Json(public_service::event_header(&state, &code).await?))
}

#[utoipa::path(
    get,
    path = "/public/queue",
    tag = "public",
    params(("eventCode" = String, Query, description = "Join code of the event")),
    responses(
        (status = 200, description = "Queue with estimated waits", body = PublicQueueResponse),
        (status = 404, description = "No active event with this code")
    )
)]
/// Live queue with status labels and estimated waits.
pub async fn get_queue(
    State(state): State<SharedState>,
    Query(query): Query<EventCodeQuery>,
) -> Result<Json<PublicQueueResponse>, AppError> {
    Ok(Json(
        public_service::public_queue(&state, &query.event_code).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/public/requests",
    tag = "public",
    params(("eventCode" = String, Query, description = "Join code of the event")),
    request_body = SubmitRequestPayload,
    responses(
        (status = 201, description = "Request queued", body = SubmissionConfirmation),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "No active event with this code"),
        (status = 409, description = "The event is not accepting requests")
    )
)]
/// Queue a song for the event addressed by `eventCode`.
pub async fn submit_request(
    State(state): State<SharedState>,
    Query(query): Query<EventCodeQuery>,
    Json(payload): Json<SubmitRequestPayload>,
) -> Result<(StatusCode, Json<SubmissionConfirmation>), AppError> {
    let confirmation =
        intake_service::submit_request(&state, &query.event_code, payload).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

#[utoipa::path(
    get,
    path = "/public/receipt",
    tag = "public",
    params(
        ("eventCode" = String, Query, description = "Join code of the event"),
        ("nickname" = String, Query, description = "Nickname used on submission"),
        ("songTitle" = String, Query, description = "Song title used on submission"),
        ("requestId" = Option<String>, Query, description = "Identifier returned by the submission")
    ),
    responses(
        (status = 200, description = "Receipt; `row` is absent when the request is gone", body = ReceiptResponse),
        (status = 404, description = "No active event with this code")
    )
)]
/// Position and estimated wait of a previously submitted request.
pub async fn get_receipt(
    State(state): State<SharedState>,
    Query(query): Query<ReceiptQuery>,
) -> Result<Json<ReceiptResponse>, AppError> {
    Ok(Json(public_service::receipt(&state, &query).await?))
}
