use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::{
        event::{CreateEventRequest, EventSummary},
        queue::OperatorQueueResponse,
        request::{
            BulkDeleteRequest, DeleteResponse, OperatorRequestPayload, RequestSummary,
            StatusChangeRequest, StatusChangeResponse,
        },
    },
    error::AppError,
    services::{event_service, intake_service, queue_service},
    state::SharedState,
};

/// Header carrying the operator token.
pub const OPERATOR_TOKEN_HEADER: &str = "x-operator-token";

/// Operator-only endpoints managing events and their queues.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/events", get(list_events).post(create_event))
        .route("/admin/events/{id}", get(get_event).delete(delete_event))
        .route(
            "/admin/events/{id}/accepting/toggle",
            post(toggle_accepting),
        )
        .route("/admin/events/{id}/queue", get(get_queue))
        .route("/admin/events/{id}/requests", post(insert_request))
        .route(
            "/admin/events/{id}/requests/bulk-delete",
            post(bulk_delete_requests),
        )
        .route(
            "/admin/events/{id}/requests/{request_id}",
            axum::routing::delete(delete_request),
        )
        .route(
            "/admin/events/{id}/requests/{request_id}/status",
            put(set_request_status),
        )
        .merge(super::sse::admin_router())
        .route_layer(middleware::from_fn_with_state(state, require_operator))
}

#[utoipa::path(
    get,
    path = "/admin/events",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token")),
    responses((status = 200, description = "Events, newest first", body = [EventSummary]))
)]
/// Event history, newest first.
pub async fn list_events(
    State(state): State<SharedState>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    Ok(Json(event_service::list_events(&state).await?))
}

#[utoipa::path(
    post,
    path = "/admin/events",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token")),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventSummary),
        (status = 400, description = "Invalid payload")
    )
)]
/// Open a new karaoke event with a fresh join code.
pub async fn create_event(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateEventRequest>>,
) -> Result<(StatusCode, Json<EventSummary>), AppError> {
    let event = event_service::create_event(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/admin/events/{id}",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event")),
    responses(
        (status = 200, description = "Event", body = EventSummary),
        (status = 404, description = "Unknown event")
    )
)]
/// Retrieve a single event.
pub async fn get_event(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventSummary>, AppError> {
    Ok(Json(event_service::get_event(&state, id).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/events/{id}",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event to delete")),
    responses(
        (status = 200, description = "Event deleted; body counts removed requests", body = DeleteResponse),
        (status = 404, description = "Unknown event")
    )
)]
/// Delete an event together with all of its requests.
pub async fn delete_event(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    Ok(Json(event_service::delete_event(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/events/{id}/accepting/toggle",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event")),
    responses(
        (status = 200, description = "Updated event", body = EventSummary),
        (status = 404, description = "Unknown event")
    )
)]
/// Open or close the event to attendee submissions.
pub async fn toggle_accepting(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EventSummary>, AppError> {
    Ok(Json(event_service::toggle_accepting(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/admin/events/{id}/queue",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event")),
    responses((status = 200, description = "Queue with provenance", body = OperatorQueueResponse))
)]
/// Operator console view of the queue.
pub async fn get_queue(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OperatorQueueResponse>, AppError> {
    Ok(Json(queue_service::operator_queue(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/events/{id}/requests",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event")),
    request_body = OperatorRequestPayload,
    responses(
        (status = 201, description = "Request inserted", body = RequestSummary),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Unknown event")
    )
)]
/// Add a song on behalf of a singer; ignores the submission gate.
pub async fn insert_request(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OperatorRequestPayload>,
) -> Result<(StatusCode, Json<RequestSummary>), AppError> {
    let request = intake_service::insert_operator_request(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    put,
    path = "/admin/events/{id}/requests/{request_id}/status",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event; unknown ids are a no-op"),
    ("request_id" = String, Path, description = "Identifier of the request")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status change outcome", body = StatusChangeResponse),
        (status = 404, description = "Unknown request")
    )
)]
/// Move a request to a new status, demoting the previous holder if needed.
pub async fn set_request_status(
    State(state): State<SharedState>,
    Path((id, request_id)): Path<(String, Uuid)>,
    Json(payload): Json<StatusChangeRequest>,
) -> Result<Json<StatusChangeResponse>, AppError> {
    Ok(Json(
        queue_service::set_status(&state, &id, request_id, payload.status).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/admin/events/{id}/requests/{request_id}",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event"),
    ("request_id" = String, Path, description = "Identifier of the request")),
    responses(
        (status = 200, description = "Request deleted", body = DeleteResponse),
        (status = 404, description = "Unknown event or request")
    )
)]
/// Delete a single request.
pub async fn delete_request(
    State(state): State<SharedState>,
    Path((id, request_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DeleteResponse>, AppError> {
    Ok(Json(
        queue_service::delete_request(&state, id, request_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/admin/events/{id}/requests/bulk-delete",
    tag = "admin",
    params(("X-Operator-Token" = String, Header, description = "Operator token"),
    ("id" = String, Path, description = "Identifier of the event")),
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "All selected requests deleted", body = DeleteResponse),
        (status = 404, description = "Unknown event or request; nothing deleted")
    )
)]
/// Delete several requests atomically.
pub async fn bulk_delete_requests(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    Ok(Json(
        queue_service::bulk_delete(&state, id, payload.request_ids).await?,
    ))
}

/// Query form of the operator token, for clients that cannot set headers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperatorTokenQuery {
    #[serde(default)]
    operator_token: Option<String>,
}

async fn require_operator(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(OPERATOR_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .or_else(|| token_from_query(req.uri()))
        .ok_or_else(|| {
            AppError::Unauthorized("missing operator token header `X-Operator-Token`".into())
        })?;

    if state.config().is_operator(&provided) {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized("invalid operator token".into()))
    }
}

fn token_from_query(uri: &Uri) -> Option<String> {
    Query::<OperatorTokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.operator_token)
}
