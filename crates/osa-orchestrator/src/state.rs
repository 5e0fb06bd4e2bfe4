//! Orchestration loop state machine
//!
//! ```text
//! Init -> Generate -> Score -> Refine -> Generate ...
//!                          \-> ConsistencyCheck -> Done
//! Generate | Score | Refine | ConsistencyCheck -> Failed -> Fallback -> Done
//! ```

use osa_types::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Run created
    Init,
    /// Backend call for a generation pass
    Generate,
    /// Scoring the latest document
    Score,
    /// Selecting context for the next pass
    Refine,
    /// Single harmonizing pass
    ConsistencyCheck,
    /// Unrecoverable failure
    Failed,
    /// Fallback generator running
    Fallback,
    /// Terminal
    Done,
}

impl LoopState {
    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Init => "init",
            LoopState::Generate => "generate",
            LoopState::Score => "score",
            LoopState::Refine => "refine",
            LoopState::ConsistencyCheck => "consistency_check",
            LoopState::Failed => "failed",
            LoopState::Fallback => "fallback",
            LoopState::Done => "done",
        }
    }

    /// True for `Done`
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Done)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition rejected by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal loop transition {from} -> {to}")]
pub struct TransitionError {
    /// Current state
    pub from: LoopState,
    /// Requested state
    pub to: LoopState,
}

impl From<TransitionError> for PipelineError {
    fn from(error: TransitionError) -> Self {
        PipelineError::InvalidTransition {
            from: error.from.to_string(),
            to: error.to.to_string(),
        }
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: LoopState) -> Vec<LoopState> {
    use LoopState::{ConsistencyCheck, Done, Fallback, Failed, Generate, Init, Refine, Score};
    match from {
        Init => vec![Generate],
        Generate => vec![Score, Failed],
        Score => vec![Refine, ConsistencyCheck, Failed],
        Refine => vec![Generate, Failed],
        ConsistencyCheck => vec![Done, Failed],
        Failed => vec![Fallback],
        Fallback => vec![Done],
        Done => vec![],
    }
}

/// Validate one transition
///
/// # Errors
/// [`TransitionError`] when `to` is not reachable from `from`.
pub fn validate_transition(from: LoopState, to: LoopState) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

/// Current state plus the ordered list of states visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTrace {
    current: LoopState,
    visited: Vec<LoopState>,
}

impl StateTrace {
    /// Trace starting at `Init`
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: LoopState::Init,
            visited: vec![LoopState::Init],
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn current(&self) -> LoopState {
        self.current
    }

    /// States visited so far
    #[inline]
    #[must_use]
    pub fn visited(&self) -> &[LoopState] {
        &self.visited
    }

    /// Move to `to` if the state machine allows it
    ///
    /// # Errors
    /// [`TransitionError`] for an illegal move; the trace is left unchanged.
    pub fn advance(&mut self, to: LoopState) -> Result<(), TransitionError> {
        validate_transition(self.current, to)?;
        self.current = to;
        self.visited.push(to);
        Ok(())
    }

    /// Names of visited states, for [`osa_types::RunResult::trace`]
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.visited.iter().map(ToString::to_string).collect()
    }
}

impl Default for StateTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refinement_cycle_is_legal() {
        let mut trace = StateTrace::new();
        for state in [
            LoopState::Generate,
            LoopState::Score,
            LoopState::Refine,
            LoopState::Generate,
            LoopState::Score,
            LoopState::ConsistencyCheck,
            LoopState::Done,
        ] {
            trace.advance(state).unwrap();
        }
        assert!(trace.current().is_terminal());
        assert_eq!(trace.visited().len(), 8);
    }

    #[test]
    fn illegal_transition_rejected() {
        let mut trace = StateTrace::new();
        let err = trace.advance(LoopState::ConsistencyCheck).unwrap_err();
        assert_eq!(err.from, LoopState::Init);
        assert_eq!(trace.current(), LoopState::Init);
    }

    #[test]
    fn done_is_terminal() {
        assert!(allowed_transitions(LoopState::Done).is_empty());
        assert!(validate_transition(LoopState::Failed, LoopState::Done).is_err());
        assert!(validate_transition(LoopState::Fallback, LoopState::Done).is_ok());
    }

    #[test]
    fn every_working_state_can_fail() {
        for state in [
            LoopState::Generate,
            LoopState::Score,
            LoopState::Refine,
            LoopState::ConsistencyCheck,
        ] {
            assert!(validate_transition(state, LoopState::Failed).is_ok(), "{state}");
        }
    }
}
