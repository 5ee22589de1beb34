use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::event::EventCodeQuery,
    error::AppError,
    services::{event_service, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/queue",
    tag = "sse",
    params(("eventCode" = String, Query, description = "Join code of the event")),
    responses(
        (status = 200, description = "Live queue of one event", content_type = "text/event-stream", body = String),
        (status = 404, description = "No active event with this code")
    )
)]
/// Push the public queue of an event whenever it changes.
pub async fn queue_stream(
    State(state): State<SharedState>,
    Query(query): Query<EventCodeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let event = event_service::find_event_by_code(&state, &query.event_code).await?;
    let degraded = state.is_degraded().await;
    info!(event_id = %event.id, "New queue SSE connection");
    Ok(sse_service::queue_stream(state, event, degraded))
}

#[utoipa::path(
    get,
    path = "/sse/admin",
    tag = "sse",
    params(("X-Operator-Token" = String, Header, description = "Operator token; `operatorToken` query parameter also accepted")),
    responses(
        (status = 200, description = "Operator SSE stream", content_type = "text/event-stream", body = String),
        (status = 401, description = "Missing or invalid operator token")
    )
)]
/// Stream event and queue changes to the operator console.
pub async fn admin_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = sse_service::subscribe_admin(&state);
    let degraded = state.is_degraded().await;
    info!("New admin SSE connection");
    sse_service::to_sse_stream(
        receiver,
        sse_service::handshake("admin", "admin stream connected", degraded),
    )
}

/// Public SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/queue", get(queue_stream))
}

/// Operator SSE endpoints; merged under the operator token layer.
pub fn admin_router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/admin", get(admin_stream))
}
