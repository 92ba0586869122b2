//! Orchestrator run states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `Fetching -> Scoring -> Persisting -> Done`, with `Failed` reachable
/// from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Fetching,
    Scoring,
    Persisting,
    Done,
    Failed,
}

impl RunState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    #[inline]
    pub fn can_transition_to(&self, target: RunState) -> bool {
        matches!(
            (self, target),
            (RunState::Fetching, RunState::Scoring)
                | (RunState::Scoring, RunState::Persisting)
                | (RunState::Persisting, RunState::Done)
                | (RunState::Fetching, RunState::Failed)
                | (RunState::Scoring, RunState::Failed)
                | (RunState::Persisting, RunState::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Fetching => "FETCHING",
            RunState::Scoring => "SCORING",
            RunState::Persisting => "PERSISTING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        assert!(RunState::Fetching.can_transition_to(RunState::Scoring));
        assert!(RunState::Scoring.can_transition_to(RunState::Persisting));
        assert!(RunState::Persisting.can_transition_to(RunState::Done));
        assert!(!RunState::Fetching.can_transition_to(RunState::Persisting));
        assert!(!RunState::Scoring.can_transition_to(RunState::Fetching));
    }

    #[test]
    fn test_terminal_states() {
        for s in [RunState::Fetching, RunState::Scoring, RunState::Persisting] {
            assert!(s.can_transition_to(RunState::Failed));
            assert!(!s.is_terminal());
        }
        assert!(!RunState::Done.can_transition_to(RunState::Failed));
        assert!(!RunState::Failed.can_transition_to(RunState::Fetching));
        assert!(RunState::Done.is_terminal());
    }
}
