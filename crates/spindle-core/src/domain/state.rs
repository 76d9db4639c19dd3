//! State - プロセッサのライフサイクル状態

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a [`Processor`](crate::app::Processor).
///
/// State transitions:
/// - Created -> Running (`start`, after crash recovery)
/// - Running -> Terminating (`terminate` sends the stop signal)
/// - Terminating -> Terminated (pool fully drained)
///
/// One-shot: there is no way back from `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorState {
    Created,
    Running,
    Terminating,
    Terminated,
}

impl ProcessorState {
    /// Is `next` the single legal successor of `self`?
    pub fn can_transition_to(self, next: ProcessorState) -> bool {
        matches!(
            (self, next),
            (ProcessorState::Created, ProcessorState::Running)
                | (ProcessorState::Running, ProcessorState::Terminating)
                | (ProcessorState::Terminating, ProcessorState::Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessorState::Terminated)
    }
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessorState::Created => "created",
            ProcessorState::Running => "running",
            ProcessorState::Terminating => "terminating",
            ProcessorState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ProcessorState::Created, ProcessorState::Running, true)]
    #[case(ProcessorState::Running, ProcessorState::Terminating, true)]
    #[case(ProcessorState::Terminating, ProcessorState::Terminated, true)]
    #[case(ProcessorState::Created, ProcessorState::Terminating, false)]
    #[case(ProcessorState::Running, ProcessorState::Terminated, false)]
    #[case(ProcessorState::Terminated, ProcessorState::Running, false)]
    #[case(ProcessorState::Running, ProcessorState::Running, false)]
    fn transitions(
        #[case] from: ProcessorState,
        #[case] to: ProcessorState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn only_terminated_is_terminal() {
        assert!(ProcessorState::Terminated.is_terminal());
        assert!(!ProcessorState::Terminating.is_terminal());
    }
}
