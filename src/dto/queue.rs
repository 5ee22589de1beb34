//! Queue views: public rows, operator rows and the submitter receipt.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{RequestOrigin, RequestStatus},
    dto::{
        event::{EventSummary, PublicEventHeader},
        format_system_time,
    },
    state::projection::{QueueRow, ReceiptLookup, ReceiptMatch},
};

/// One row of the public queue.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueRowView {
    /// 1-based position in arrival order.
    pub position: usize,
    pub request_id: Uuid,
    pub nickname: String,
    pub song_title: String,
    pub key_shift: i8,
    pub status: RequestStatus,
    pub status_label: String,
    /// Estimated wait in whole minutes.
    pub wait_minutes: u32,
}

impl From<&QueueRow> for QueueRowView {
    fn from(row: &QueueRow) -> Self {
        Self {
            position: row.position,
            request_id: row.request_id,
            nickname: row.nickname.clone(),
            song_title: row.song_title.clone(),
            key_shift: row.key_shift,
            status: row.status,
            status_label: row.status_label().to_owned(),
            wait_minutes: row.wait_minutes,
        }
    }
}

/// Operator row: the public row plus provenance.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorQueueRow {
    #[serde(flatten)]
    pub row: QueueRowView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RequestOrigin>,
    pub created_at: String,
}

impl From<&QueueRow> for OperatorQueueRow {
    fn from(row: &QueueRow) -> Self {
        Self {
            row: row.into(),
            created_by: row.created_by,
            created_at: format_system_time(row.created_at),
        }
    }
}

/// Live queue as shown to attendees.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicQueueResponse {
    pub event: PublicEventHeader,
    pub rows: Vec<QueueRowView>,
}

/// Queue as shown on the operator console.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperatorQueueResponse {
    pub event: EventSummary,
    pub request_count: usize,
    pub rows: Vec<OperatorQueueRow>,
}

/// Query string of the receipt view.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptQuery {
    pub event_code: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub song_title: String,
    /// Identifier returned by the submission; malformed values are ignored.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ReceiptQuery {
    /// Request id, when present and well formed.
    pub fn parsed_request_id(&self) -> Option<Uuid> {
        self.request_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }
}

/// How the receipt row was found.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptMatchKind {
    RequestId,
    /// Approximate; the latest request with the same nickname and title.
    NicknameAndTitle,
}

impl From<ReceiptMatch> for ReceiptMatchKind {
    fn from(value: ReceiptMatch) -> Self {
        match value {
            ReceiptMatch::ById => ReceiptMatchKind::RequestId,
            ReceiptMatch::ByNicknameAndTitle => ReceiptMatchKind::NicknameAndTitle,
        }
    }
}

/// Submitter receipt. `row` is absent when the request could not be located.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub event_code: String,
    pub nickname: String,
    pub song_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<QueueRowView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<ReceiptMatchKind>,
}

impl ReceiptResponse {
    /// Echo the submitted fields next to the located row, if any.
    pub fn new(query: &ReceiptQuery, event_code: String, lookup: Option<ReceiptLookup<'_>>) -> Self {
        Self {
            event_code,
            nickname: query.nickname.clone(),
            song_title: query.song_title.clone(),
            row: lookup.as_ref().map(|found| found.row.into()),
            matched_by: lookup.map(|found| found.matched_by.into()),
        }
    }
}
