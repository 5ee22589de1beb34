/// OpenAPI documentation generation.
pub mod documentation;
/// Event registry: creation, lookup, gate and cascade deletion.
pub mod event_service;
/// Health check service.
pub mod health_service;
/// Attendee and operator request intake.
pub mod intake_service;
/// Public service for read-only queue projections.
pub mod public_service;
/// Operator queue mutations and console view.
pub mod queue_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
