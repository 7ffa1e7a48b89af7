use crate::{LifecycleError, TaskEffect, TaskMsg, TaskState};

/// Pure lifecycle transition: applies a message to a state and returns the
/// next state plus the effects the engine must carry out, in order.
///
/// `Terminated` is absorbing; starting or restarting it is an error.
pub fn update(
    state: TaskState,
    msg: TaskMsg,
) -> Result<(TaskState, Vec<TaskEffect>), LifecycleError> {
    use TaskEffect::{AwaitExit, Cancel, Launch, PublishFault, Release};

    let transition = match (state, msg) {
        (TaskState::Terminated, TaskMsg::Start | TaskMsg::Restart) => {
            return Err(LifecycleError::InvalidTransition {
                from: state,
                attempted: msg,
            });
        }
        // A fault may still surface from a worker that was told to stop
        // before termination; subscribers hear about it, the state stays.
        (TaskState::Terminated, TaskMsg::WorkFaulted) => (state, vec![PublishFault]),
        (TaskState::Terminated, _) => (state, Vec::new()),

        (TaskState::Running, TaskMsg::Start) => (state, Vec::new()),
        (_, TaskMsg::Start) => (TaskState::Running, vec![Launch]),

        (s, TaskMsg::Stop { wait }) if s.is_cancellable() => {
            let effects = if wait {
                vec![Cancel, AwaitExit]
            } else {
                vec![Cancel]
            };
            (TaskState::Stopped, effects)
        }
        (_, TaskMsg::Stop { .. }) => (state, Vec::new()),

        (s, TaskMsg::Restart) if s.is_cancellable() => {
            (TaskState::Running, vec![Cancel, AwaitExit, Launch])
        }
        (_, TaskMsg::Restart) => (TaskState::Running, vec![AwaitExit, Launch]),

        (s, TaskMsg::Terminate) if s.is_cancellable() => {
            (TaskState::Terminated, vec![Cancel, AwaitExit, Release])
        }
        (_, TaskMsg::Terminate) => (TaskState::Terminated, vec![AwaitExit, Release]),

        (TaskState::Running, TaskMsg::WorkExited) => (TaskState::Stopped, Vec::new()),
        (_, TaskMsg::WorkExited) => (state, Vec::new()),

        (_, TaskMsg::WorkFaulted) => (TaskState::Faulted, vec![PublishFault]),
    };

    Ok(transition)
}
