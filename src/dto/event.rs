//! DTOs describing karaoke events for both the operator and the public surface.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::EventEntity,
    dto::{format_system_time, validation::validate_not_blank},
    state::wait::resolve_song_minutes,
};

/// Payload used by the operator to open a new karaoke night.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(max = 80), custom(function = "validate_not_blank"))]
    pub name: String,
    /// Average minutes per song; the configured default applies when omitted.
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, max = 60.0))]
    pub song_minutes_avg: Option<f64>,
}

/// Full event description returned to operators.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub join_code: String,
    pub is_active: bool,
    pub accepting_requests: bool,
    /// Resolved average minutes per song used by the wait estimator.
    pub song_minutes_avg: f64,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<EventEntity> for EventSummary {
    fn from(event: EventEntity) -> Self {
        Self {
            id: event.id,
            name: event.name,
            join_code: event.join_code,
            is_active: event.is_active,
            accepting_requests: event.accepting_requests,
            song_minutes_avg: resolve_song_minutes(event.song_minutes_avg),
            created_at: format_system_time(event.created_at),
        }
    }
}

/// Event header visible to attendees holding the join code.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicEventHeader {
    pub name: String,
    pub join_code: String,
    pub accepting_requests: bool,
    pub song_minutes_avg: f64,
}

impl From<&EventEntity> for PublicEventHeader {
    fn from(event: &EventEntity) -> Self {
        Self {
            name: event.name.clone(),
            join_code: event.join_code.clone(),
            accepting_requests: event.accepting_requests,
            song_minutes_avg: resolve_song_minutes(event.song_minutes_avg),
        }
    }
}

/// Query string carrying the join code of the addressed event.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventCodeQuery {
    pub event_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_event_rejects_blank_name_and_bad_average() {
        let blank = CreateEventRequest {
            name: "   ".into(),
            song_minutes_avg: None,
        };
        assert!(blank.validate().is_err());

        let zero = CreateEventRequest {
            name: "Friday".into(),
            song_minutes_avg: Some(0.0),
        };
        assert!(zero.validate().is_err());

        let ok = CreateEventRequest {
            name: "Friday".into(),
            song_minutes_avg: Some(3.5),
        };
        assert!(ok.validate().is_ok());
    }
}
