use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the karaoke queue backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_event_header,
        crate::routes::public::get_queue,
        crate::routes::public::submit_request,
        crate::routes::public::get_receipt,
        crate::routes::admin::list_events,
        crate::routes::admin::create_event,
        crate::routes::admin::get_event,
        crate::routes::admin::delete_event,
        crate::routes::admin::toggle_accepting,
        crate::routes::admin::get_queue,
        crate::routes::admin::insert_request,
        crate::routes::admin::set_request_status,
        crate::routes::admin::delete_request,
        crate::routes::admin::bulk_delete_requests,
        crate::routes::sse::queue_stream,
        crate::routes::sse::admin_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dao::models::RequestStatus,
            crate::dao::models::RequestOrigin,
            crate::dto::event::CreateEventRequest,
            crate::dto::event::EventSummary,
            crate::dto::event::PublicEventHeader,
            crate::dto::queue::QueueRowView,
            crate::dto::queue::OperatorQueueRow,
            crate::dto::queue::PublicQueueResponse,
            crate::dto::queue::OperatorQueueResponse,
            crate::dto::queue::ReceiptMatchKind,
            crate::dto::queue::ReceiptResponse,
            crate::dto::request::SubmitRequestPayload,
            crate::dto::request::OperatorRequestPayload,
            crate::dto::request::RequestSummary,
            crate::dto::request::SubmissionConfirmation,
            crate::dto::request::StatusChangeRequest,
            crate::dto::request::StatusChangeOutcome,
            crate::dto::request::StatusChangeResponse,
            crate::dto::request::BulkDeleteRequest,
            crate::dto::request::DeleteResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::EventClosedEvent,
            crate::dto::sse::EventUpsertedEvent,
            crate::dto::sse::EventDeletedEvent,
            crate::dto::sse::QueueChangedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Attendee endpoints addressed by join code"),
        (name = "admin", description = "Operator endpoints; require `X-Operator-Token`"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
