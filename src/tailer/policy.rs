//! Throttled commit policy
//!
//! Evaluated synchronously on the delivery path. The gate is measured in
//! event time (position seconds), not wall-clock time: a burst spanning more
//! than a minute of event time commits more than once, an idle feed commits
//! only when the idle advance moves the delivered position.

use super::state::TailerState;
use crate::position::Position;

/// Minimum event-time gap, in seconds, between continuous-mode commits.
pub const COMMIT_INTERVAL_SECS: u64 = 60;

/// What the throttle says about the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDecision {
    /// Nothing delivered yet
    NothingDelivered,
    /// Last commit is recent enough in event time
    Throttled,
    /// Write this position now
    Due(Position),
}

/// Decides whether the delivered position should be committed.
///
/// Due when nothing was ever committed, or when the delivered position is
/// more than [`COMMIT_INTERVAL_SECS`] seconds past the committed one.
pub fn evaluate(state: &TailerState) -> CommitDecision {
    let Some(delivered) = state.last_delivered() else {
        return CommitDecision::NothingDelivered;
    };

    match state.last_committed() {
        None => CommitDecision::Due(delivered),
        Some(committed) if delivered.seconds_since(&committed) > COMMIT_INTERVAL_SECS => {
            CommitDecision::Due(delivered)
        }
        Some(_) => CommitDecision::Throttled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tailer::state::TailerMode;

    fn state(delivered: Option<Position>, committed: Option<Position>) -> TailerState {
        let mut state = TailerState::new(TailerMode::Continuous);
        if let Some(p) = committed {
            state.record_committed(p);
        }
        if let Some(p) = delivered {
            state.record_delivered(p).unwrap();
        }
        state
    }

    #[test]
    fn test_nothing_delivered() {
        assert_eq!(evaluate(&state(None, None)), CommitDecision::NothingDelivered);
    }

    #[test]
    fn test_first_delivery_is_due() {
        let p = Position::new(1000, 1);
        assert_eq!(evaluate(&state(Some(p), None)), CommitDecision::Due(p));
    }

    #[test]
    fn test_exactly_sixty_seconds_is_throttled() {
        let committed = Position::new(1000, 1);
        let delivered = Position::new(1060, 9);
        assert_eq!(
            evaluate(&state(Some(delivered), Some(committed))),
            CommitDecision::Throttled
        );
    }

    #[test]
    fn test_sixty_one_seconds_is_due() {
        let committed = Position::new(1000, 1);
        let delivered = Position::new(1061, 0);
        assert_eq!(
            evaluate(&state(Some(delivered), Some(committed))),
            CommitDecision::Due(delivered)
        );
    }

    #[test]
    fn test_ordinal_does_not_count() {
        let committed = Position::new(1000, 0);
        let delivered = Position::new(1000, 500);
        assert_eq!(
            evaluate(&state(Some(delivered), Some(committed))),
            CommitDecision::Throttled
        );
    }
}
