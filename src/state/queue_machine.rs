use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{BatchOp, RequestEntity, RequestStatus};

/// Writes required to move one request to a new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Request being moved.
    pub request_id: Uuid,
    /// Status the request held in the planning snapshot.
    pub from: RequestStatus,
    /// Status the request will hold after the commit.
    pub to: RequestStatus,
    /// Other requests pushed back to `WAITING` to keep the target status exclusive.
    pub demoted: Vec<Uuid>,
}

impl TransitionPlan {
    /// Flatten the plan into one atomic batch, demotions first.
    pub fn operations(&self) -> Vec<BatchOp> {
        self.demoted
            .iter()
            .map(|&request_id| BatchOp::SetStatus {
                request_id,
                status: RequestStatus::Waiting,
            })
            .chain(std::iter::once(BatchOp::SetStatus {
                request_id: self.request_id,
                status: self.to,
            }))
            .collect()
    }
}

/// Reason a status change could not be planned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("request `{0}` does not belong to this event")]
    UnknownRequest(Uuid),
}

/// Plan moving `request_id` to `target` against one snapshot of the event queue.
///
/// When the target is `NEXT` or `ON_STAGE`, every other holder of that status
/// is demoted in the same plan so at most one request keeps it afterwards.
/// `WAITING` only rewrites the targeted request.
pub fn plan_status_change(
    snapshot: &[RequestEntity],
    request_id: Uuid,
    target: RequestStatus,
) -> Result<TransitionPlan, TransitionError> {
    let current = snapshot
        .iter()
        .find(|request| request.id == request_id)
        .ok_or(TransitionError::UnknownRequest(request_id))?;

    let demoted = if target.is_exclusive() {
        snapshot
            .iter()
            .filter(|request| request.id != request_id && request.status == target)
            .map(|request| request.id)
            .collect()
    } else {
        Vec::new()
    };

    Ok(TransitionPlan {
        request_id,
        from: current.status,
        to: target,
        demoted,
    })
}

/// Apply a plan to an in-memory snapshot, mirroring what the store commit does.
pub fn apply_plan(snapshot: &mut [RequestEntity], plan: &TransitionPlan) {
    for request in snapshot.iter_mut() {
        if request.id == plan.request_id {
            request.status = plan.to;
        } else if plan.demoted.contains(&request.id) {
            request.status = RequestStatus::Waiting;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::dao::models::RequestOrigin;

    fn queue(len: usize) -> Vec<RequestEntity> {
        let event_id = Uuid::new_v4();
        (0..len)
            .map(|i| RequestEntity {
                id: Uuid::new_v4(),
                event_id,
                nickname: format!("singer-{i}"),
                song_title: format!("song-{i}"),
                key_shift: 0,
                status: RequestStatus::Waiting,
                created_at: UNIX_EPOCH + Duration::from_secs(i as u64),
                created_by: Some(RequestOrigin::Attendee),
            })
            .collect()
    }

    fn count(snapshot: &[RequestEntity], status: RequestStatus) -> usize {
        snapshot.iter().filter(|r| r.status == status).count()
    }

    fn set(snapshot: &mut [RequestEntity], index: usize, status: RequestStatus) -> TransitionPlan {
        let plan = plan_status_change(snapshot, snapshot[index].id, status).unwrap();
        apply_plan(snapshot, &plan);
        plan
    }

    #[test]
    fn promoting_to_next_demotes_previous_next() {
        let mut snapshot = queue(3);
        set(&mut snapshot, 0, RequestStatus::Next);
        let plan = set(&mut snapshot, 2, RequestStatus::Next);

        assert_eq!(plan.demoted, vec![snapshot[0].id]);
        assert_eq!(snapshot[0].status, RequestStatus::Waiting);
        assert_eq!(snapshot[2].status, RequestStatus::Next);
    }

    #[test]
    fn on_stage_does_not_touch_next_holder() {
        let mut snapshot = queue(3);
        set(&mut snapshot, 2, RequestStatus::Next);
        let plan = set(&mut snapshot, 0, RequestStatus::OnStage);

        assert!(plan.demoted.is_empty());
        assert_eq!(snapshot[0].status, RequestStatus::OnStage);
        assert_eq!(snapshot[2].status, RequestStatus::Next);
    }

    #[test]
    fn waiting_only_rewrites_the_target() {
        let mut snapshot = queue(2);
        set(&mut snapshot, 0, RequestStatus::OnStage);
        set(&mut snapshot, 1, RequestStatus::Next);
        let plan = set(&mut snapshot, 0, RequestStatus::Waiting);

        assert_eq!(plan.from, RequestStatus::OnStage);
        assert_eq!(plan.operations().len(), 1);
        assert_eq!(snapshot[1].status, RequestStatus::Next);
    }

    #[test]
    fn operations_list_demotions_before_promotion() {
        let mut snapshot = queue(2);
        set(&mut snapshot, 0, RequestStatus::OnStage);
        let plan = plan_status_change(&snapshot, snapshot[1].id, RequestStatus::OnStage).unwrap();

        assert_eq!(
            plan.operations(),
            vec![
                BatchOp::SetStatus {
                    request_id: snapshot[0].id,
                    status: RequestStatus::Waiting,
                },
                BatchOp::SetStatus {
                    request_id: snapshot[1].id,
                    status: RequestStatus::OnStage,
                },
            ]
        );
    }

    #[test]
    fn unknown_request_is_rejected() {
        let snapshot = queue(2);
        let missing = Uuid::new_v4();
        assert_eq!(
            plan_status_change(&snapshot, missing, RequestStatus::Next),
            Err(TransitionError::UnknownRequest(missing))
        );
    }

    #[test]
    fn random_sequences_keep_exclusive_statuses_and_arrival_order() {
        let statuses = [
            RequestStatus::Waiting,
            RequestStatus::Next,
            RequestStatus::OnStage,
        ];
        let mut rng = StdRng::seed_from_u64(0x6b61_726f);

        for _ in 0..50 {
            let mut snapshot = queue(rng.random_range(1..8));
            let arrival: Vec<Uuid> = snapshot.iter().map(|r| r.id).collect();

            for _ in 0..40 {
                let index = rng.random_range(0..snapshot.len());
                let status = statuses[rng.random_range(0..statuses.len())];
                set(&mut snapshot, index, status);

                assert!(count(&snapshot, RequestStatus::OnStage) <= 1);
                assert!(count(&snapshot, RequestStatus::Next) <= 1);
            }

            let after: Vec<Uuid> = snapshot.iter().map(|r| r.id).collect();
            assert_eq!(after, arrival);
        }
    }
}
