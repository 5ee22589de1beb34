use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::{RequestEntity, RequestOrigin, RequestStatus},
    state::wait::{estimate_wait_minutes, resolve_song_minutes},
};

/// One view-ready line of an event queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    /// 1-based position in arrival order.
    pub position: usize,
    pub request_id: Uuid,
    pub nickname: String,
    pub song_title: String,
    pub key_shift: i8,
    pub status: RequestStatus,
    pub wait_minutes: u32,
    pub created_by: Option<RequestOrigin>,
    pub created_at: SystemTime,
}

impl QueueRow {
    /// Label shown next to the row.
    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }
}

/// Build the queue rows from one snapshot, which must already be in arrival order.
pub fn project_queue(requests: &[RequestEntity], song_minutes_avg: Option<f64>) -> Vec<QueueRow> {
    let avg = resolve_song_minutes(song_minutes_avg);
    let statuses: Vec<RequestStatus> = requests.iter().map(|request| request.status).collect();

    requests
        .iter()
        .enumerate()
        .map(|(index, request)| QueueRow {
            position: index + 1,
            request_id: request.id,
            nickname: request.nickname.clone(),
            song_title: request.song_title.clone(),
            key_shift: request.key_shift,
            status: request.status,
            wait_minutes: estimate_wait_minutes(&statuses, index, avg),
            created_by: request.created_by,
            created_at: request.created_at,
        })
        .collect()
}

/// How a receipt row was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptMatch {
    /// Exact match on the request identifier.
    ById,
    /// Best-effort match on nickname and song title; ambiguous under duplicates.
    ByNicknameAndTitle,
}

/// Row found for a submitter receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLookup<'a> {
    pub row: &'a QueueRow,
    pub matched_by: ReceiptMatch,
}

/// Find the row a submitter is looking for.
///
/// The request id wins when present and found. Otherwise the most recent row
/// whose nickname and song title both equal the submitted ones is returned.
pub fn locate_receipt<'a>(
    rows: &'a [QueueRow],
    request_id: Option<Uuid>,
    nickname: &str,
    song_title: &str,
) -> Option<ReceiptLookup<'a>> {
    if let Some(row) = request_id.and_then(|id| rows.iter().find(|row| row.request_id == id)) {
        return Some(ReceiptLookup {
            row,
            matched_by: ReceiptMatch::ById,
        });
    }

    rows.iter()
        .rev()
        .find(|row| row.nickname == nickname && row.song_title == song_title)
        .map(|row| ReceiptLookup {
            row,
            matched_by: ReceiptMatch::ByNicknameAndTitle,
        })
}
