use crate::dao::models::RequestStatus;

/// Minutes per song assumed when an event has no usable setting.
pub const DEFAULT_SONG_MINUTES: f64 = 4.5;

/// Resolve the configured average, replacing absent, non-positive or
/// non-finite values with [`DEFAULT_SONG_MINUTES`].
pub fn resolve_song_minutes(configured: Option<f64>) -> f64 {
    match configured {
        Some(value) if value.is_finite() && value > 0.0 => value,
        _ => DEFAULT_SONG_MINUTES,
    }
}

/// Estimated wait, in whole minutes, for the request at `index` of a queue
/// given in arrival order.
///
/// `ON_STAGE` waits nothing, `NEXT` waits one song (at least a minute) and a
/// `WAITING` request waits one song for every entry ahead of it that is not
/// already on stage. Out-of-range indices yield 0.
pub fn estimate_wait_minutes(statuses: &[RequestStatus], index: usize, avg_minutes: f64) -> u32 {
    let Some(status) = statuses.get(index) else {
        return 0;
    };
    let avg = resolve_song_minutes(Some(avg_minutes));

    match status {
        RequestStatus::OnStage => 0,
        RequestStatus::Next => whole_minutes(avg).max(1),
        RequestStatus::Waiting => {
            let ahead = statuses[..index]
                .iter()
                .filter(|status| **status != RequestStatus::OnStage)
                .count();
            whole_minutes(ahead as f64 * avg)
        }
    }
}

fn whole_minutes(minutes: f64) -> u32 {
    let rounded = minutes.ceil();
    if rounded <= 0.0 {
        0
    } else if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        rounded as u32
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;
    use crate::dao::models::RequestStatus::{Next, OnStage, Waiting};

    fn waits(statuses: &[RequestStatus], avg: f64) -> Vec<u32> {
        (0..statuses.len())
            .map(|index| estimate_wait_minutes(statuses, index, avg))
            .collect()
    }

    #[test]
    fn three_waiting_requests() {
        assert_eq!(waits(&[Waiting, Waiting, Waiting], 4.5), vec![0, 5, 9]);
    }

    #[test]
    fn last_request_promoted_to_next() {
        assert_eq!(waits(&[Waiting, Waiting, Next], 4.5), vec![0, 5, 5]);
    }

    #[test]
    fn requests_on_stage_are_not_counted_ahead() {
        assert_eq!(waits(&[OnStage, Waiting, Next], 4.5), vec![0, 0, 5]);
    }

    #[test]
    fn unusable_averages_fall_back_to_default() {
        for avg in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert_eq!(resolve_song_minutes(Some(avg)), DEFAULT_SONG_MINUTES);
            assert_eq!(waits(&[Waiting, Waiting], avg), vec![0, 5]);
        }
        assert_eq!(resolve_song_minutes(None), DEFAULT_SONG_MINUTES);
        assert_eq!(resolve_song_minutes(Some(3.0)), 3.0);
    }

    #[test]
    fn next_waits_at_least_a_minute() {
        assert_eq!(estimate_wait_minutes(&[Next], 0, 0.2), 1);
    }

    #[test]
    fn out_of_range_index_is_zero() {
        assert_eq!(estimate_wait_minutes(&[Waiting], 5, 4.5), 0);
        assert_eq!(estimate_wait_minutes(&[], 0, 4.5), 0);
    }

    #[test]
    fn waiting_requests_never_overtake_each_other() {
        let statuses = [Waiting, Next, OnStage];
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let queue: Vec<RequestStatus> = (0..rng.random_range(1..12))
                .map(|_| statuses[rng.random_range(0..statuses.len())])
                .collect();
            let avg = rng.random_range(0.5..10.0);
            let computed = waits(&queue, avg);

            let waiting: Vec<u32> = queue
                .iter()
                .zip(&computed)
                .filter(|(status, _)| **status == Waiting)
                .map(|(_, wait)| *wait)
                .collect();
            assert!(waiting.windows(2).all(|pair| pair[0] <= pair[1]));

            for (status, wait) in queue.iter().zip(&computed) {
                if *status == OnStage {
                    assert_eq!(*wait, 0);
                }
            }
        }
    }
}
