use skraper_core::{LifecycleError, ParseDurationError, TaskMsg, TaskState};
use thiserror::Error;

/// Failure reported by the automation layer for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationError {
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("no such element: {0}")]
    NoSuchElement(String),
    #[error("stale element reference: {0}")]
    StaleElement(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script error: {0}")]
    Script(String),
    #[error("automation session closed")]
    SessionClosed,
    #[error("unsupported automation call: {0}")]
    Unsupported(String),
}

impl AutomationError {
    /// Transient faults are recovered locally; anything else is a programming
    /// error and must not be turned into a sentinel.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AutomationError::Unsupported(_))
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unimplemented: {0}")]
    Unimplemented(String),
    #[error("runtime parse fault for {id}: {source}")]
    Parse {
        id: String,
        #[source]
        source: ParseDurationError,
    },
    #[error("failed to launch automation session: {0}")]
    Launch(AutomationError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task '{owner}': invalid lifecycle transition {attempted:?} from {from}")]
    InvalidLifecycleTransition {
        owner: String,
        from: TaskState,
        attempted: TaskMsg,
    },
    #[error("task '{owner}': failed to spawn worker: {source}")]
    Spawn {
        owner: String,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    pub(crate) fn lifecycle(owner: &str, err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, attempted } => {
                TaskError::InvalidLifecycleTransition {
                    owner: owner.to_string(),
                    from,
                    attempted,
                }
            }
        }
    }
}
