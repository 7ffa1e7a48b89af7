use std::sync::Once;

use pretty_assertions::assert_eq;
use skraper_core::{update, LifecycleError, TaskEffect, TaskMsg, TaskState};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

const ALL_STATES: [TaskState; 5] = [
    TaskState::Created,
    TaskState::Running,
    TaskState::Stopped,
    TaskState::Faulted,
    TaskState::Terminated,
];

const ALL_MSGS: [TaskMsg; 7] = [
    TaskMsg::Start,
    TaskMsg::Stop { wait: false },
    TaskMsg::Stop { wait: true },
    TaskMsg::Restart,
    TaskMsg::Terminate,
    TaskMsg::WorkExited,
    TaskMsg::WorkFaulted,
];

#[test]
fn start_launches_from_every_idle_state() {
    init_logging();
    for state in [TaskState::Created, TaskState::Stopped, TaskState::Faulted] {
        let (next, effects) = update(state, TaskMsg::Start).unwrap();
        assert_eq!(next, TaskState::Running);
        assert_eq!(effects, vec![TaskEffect::Launch]);
    }
}

#[test]
fn start_while_running_is_noop() {
    init_logging();
    let (next, effects) = update(TaskState::Running, TaskMsg::Start).unwrap();
    assert_eq!(next, TaskState::Running);
    assert!(effects.is_empty());
}

#[test]
fn stop_cancels_and_optionally_waits() {
    init_logging();
    let (next, effects) = update(TaskState::Running, TaskMsg::Stop { wait: false }).unwrap();
    assert_eq!(next, TaskState::Stopped);
    assert_eq!(effects, vec![TaskEffect::Cancel]);

    let (next, effects) = update(TaskState::Faulted, TaskMsg::Stop { wait: true }).unwrap();
    assert_eq!(next, TaskState::Stopped);
    assert_eq!(effects, vec![TaskEffect::Cancel, TaskEffect::AwaitExit]);

    let (next, effects) = update(TaskState::Created, TaskMsg::Stop { wait: true }).unwrap();
    assert_eq!(next, TaskState::Created);
    assert!(effects.is_empty());
}

#[test]
fn restart_waits_before_launching() {
    init_logging();
    let (next, effects) = update(TaskState::Running, TaskMsg::Restart).unwrap();
    assert_eq!(next, TaskState::Running);
    assert_eq!(
        effects,
        vec![TaskEffect::Cancel, TaskEffect::AwaitExit, TaskEffect::Launch]
    );

    let (next, effects) = update(TaskState::Stopped, TaskMsg::Restart).unwrap();
    assert_eq!(next, TaskState::Running);
    assert_eq!(effects, vec![TaskEffect::AwaitExit, TaskEffect::Launch]);
}

#[test]
fn terminate_waits_then_releases() {
    init_logging();
    let (next, effects) = update(TaskState::Running, TaskMsg::Terminate).unwrap();
    assert_eq!(next, TaskState::Terminated);
    assert_eq!(
        effects,
        vec![TaskEffect::Cancel, TaskEffect::AwaitExit, TaskEffect::Release]
    );

    let (next, effects) = update(TaskState::Terminated, TaskMsg::Terminate).unwrap();
    assert_eq!(next, TaskState::Terminated);
    assert!(effects.is_empty());
}

#[test]
fn terminated_is_absorbing() {
    init_logging();
    for msg in ALL_MSGS {
        match update(TaskState::Terminated, msg) {
            Ok((next, _)) => assert_eq!(next, TaskState::Terminated, "{msg:?}"),
            Err(LifecycleError::InvalidTransition { from, attempted }) => {
                assert_eq!(from, TaskState::Terminated);
                assert_eq!(attempted, msg);
                assert!(matches!(msg, TaskMsg::Start | TaskMsg::Restart));
            }
        }
    }
}

#[test]
fn only_terminated_rejects_messages() {
    init_logging();
    for state in ALL_STATES {
        for msg in ALL_MSGS {
            let rejected = update(state, msg).is_err();
            let expected =
                state == TaskState::Terminated && matches!(msg, TaskMsg::Start | TaskMsg::Restart);
            assert_eq!(rejected, expected, "{state:?} + {msg:?}");
        }
    }
}

#[test]
fn worker_exit_moves_running_to_stopped() {
    init_logging();
    assert_eq!(
        update(TaskState::Running, TaskMsg::WorkExited).unwrap(),
        (TaskState::Stopped, Vec::new())
    );
    assert_eq!(
        update(TaskState::Stopped, TaskMsg::WorkExited).unwrap(),
        (TaskState::Stopped, Vec::new())
    );
}

#[test]
fn worker_fault_is_published() {
    init_logging();
    for state in [TaskState::Running, TaskState::Stopped] {
        assert_eq!(
            update(state, TaskMsg::WorkFaulted).unwrap(),
            (TaskState::Faulted, vec![TaskEffect::PublishFault])
        );
    }
    assert_eq!(
        update(TaskState::Terminated, TaskMsg::WorkFaulted).unwrap(),
        (TaskState::Terminated, vec![TaskEffect::PublishFault])
    );
}
