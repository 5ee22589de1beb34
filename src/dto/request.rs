//! DTOs for song request intake, status changes and removals.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{RequestEntity, RequestOrigin, RequestStatus},
    dto::{format_system_time, validation::validate_not_blank},
};

/// Maximum characters kept for a nickname.
pub const NICKNAME_MAX_LEN: u64 = 60;
/// Maximum characters kept for a song title.
pub const SONG_TITLE_MAX_LEN: u64 = 120;

/// Attendee submission form. Missing fields read as blank so the gate is
/// checked before field validity.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestPayload {
    #[serde(default)]
    #[validate(
        length(max = NICKNAME_MAX_LEN),
        custom(function = "validate_not_blank")
    )]
    pub nickname: String,
    #[serde(default)]
    #[validate(
        length(max = SONG_TITLE_MAX_LEN),
        custom(function = "validate_not_blank")
    )]
    pub song_title: String,
    /// Transposition in semitones, between -3 and +3.
    #[serde(default)]
    #[validate(range(min = -3, max = 3))]
    pub key_shift: i32,
}

impl SubmitRequestPayload {
    /// Copy of the payload with surrounding whitespace removed.
    pub fn trimmed(&self) -> Self {
        Self {
            nickname: self.nickname.trim().to_owned(),
            song_title: self.song_title.trim().to_owned(),
            key_shift: self.key_shift,
        }
    }
}

/// Operator "add song" form; the nickname may be left blank.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRequestPayload {
    #[serde(default)]
    #[validate(length(max = NICKNAME_MAX_LEN))]
    pub nickname: Option<String>,
    #[validate(
        length(max = SONG_TITLE_MAX_LEN),
        custom(function = "validate_not_blank")
    )]
    pub song_title: String,
    #[serde(default)]
    #[validate(range(min = -3, max = 3))]
    pub key_shift: i32,
}

/// A stored song request.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: Uuid,
    pub event_id: Uuid,
    pub nickname: String,
    pub song_title: String,
    pub key_shift: i8,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RequestOrigin>,
    pub created_at: String,
}

impl From<RequestEntity> for RequestSummary {
    fn from(request: RequestEntity) -> Self {
        Self {
            id: request.id,
            event_id: request.event_id,
            nickname: request.nickname,
            song_title: request.song_title,
            key_shift: request.key_shift,
            status: request.status,
            created_by: request.created_by,
            created_at: format_system_time(request.created_at),
        }
    }
}

/// Parameters a client needs to open the receipt of a fresh submission.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionConfirmation {
    pub event_code: String,
    pub nickname: String,
    pub song_title: String,
    pub request_id: Uuid,
    pub request: RequestSummary,
}

/// Target status of an operator status change.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    pub status: RequestStatus,
}

/// Result kind of a status change.
#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusChangeOutcome {
    /// The batch was committed.
    Applied,
    /// The event id was blank or unknown; nothing was written.
    NoActiveEvent,
}

/// Response of a status change.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub outcome: StatusChangeOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    /// Requests moved back to `WAITING` by the same commit.
    pub demoted: Vec<Uuid>,
}

impl StatusChangeResponse {
    /// Response for an operation that targeted no active event.
    pub fn no_active_event() -> Self {
        Self {
            outcome: StatusChangeOutcome::NoActiveEvent,
            request_id: None,
            status: None,
            demoted: Vec::new(),
        }
    }
}

/// Selection of requests to delete atomically.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub request_ids: Vec<Uuid>,
}

/// Number of requests removed by a delete.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(nickname: &str, song_title: &str, key_shift: i32) -> SubmitRequestPayload {
        SubmitRequestPayload {
            nickname: nickname.into(),
            song_title: song_title.into(),
            key_shift,
        }
    }

    #[test]
    fn trimmed_payload_is_validated() {
        assert!(payload(" anna ", " Volare ", 0).trimmed().validate().is_ok());
        assert!(payload("  ", "Volare", 0).trimmed().validate().is_err());
        assert!(payload("anna", "", 0).trimmed().validate().is_err());
    }

    #[test]
    fn key_shift_outside_range_is_rejected() {
        assert!(payload("anna", "Volare", 3).validate().is_ok());
        assert!(payload("anna", "Volare", -3).validate().is_ok());
        assert!(payload("anna", "Volare", 4).validate().is_err());
        assert!(payload("anna", "Volare", -4).validate().is_err());
    }

    #[test]
    fn overlong_fields_are_rejected() {
        let long_name = "x".repeat(NICKNAME_MAX_LEN as usize + 1);
        assert!(payload(&long_name, "Volare", 0).validate().is_err());
    }

    #[test]
    fn missing_fields_deserialize_as_blank() {
        let parsed: SubmitRequestPayload = serde_json::from_str(r#"{"nickname":"anna"}"#).unwrap();
        assert_eq!(parsed.song_title, "");
        assert_eq!(parsed.key_shift, 0);
        assert!(parsed.validate().is_err());
    }
}
