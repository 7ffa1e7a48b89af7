use std::fmt;

use thiserror::Error;

use crate::TaskMsg;

/// Lifecycle state of one cancellable unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Created,
    Running,
    Stopped,
    Faulted,
    /// Absorbing: no transition leaves it.
    Terminated,
}

impl TaskState {
    /// True while a cancellation request would reach a worker.
    pub fn is_cancellable(self) -> bool {
        matches!(self, TaskState::Running | TaskState::Faulted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::Stopped => "stopped",
            TaskState::Faulted => "faulted",
            TaskState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition: {attempted:?} from {from}")]
    InvalidTransition { from: TaskState, attempted: TaskMsg },
}
