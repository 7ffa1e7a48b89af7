//! Lifecycle wrapper around one long-running, cooperatively cancellable unit
//! of work.
//!
//! Every run gets its own thread and single-threaded tokio runtime. State
//! changes go through [`skraper_core::update`]; the effects it returns are
//! carried out here under one lifecycle lock, so `start`, `stop`, `restart`
//! and `terminate` never interleave on the same task.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use engine_logging::{engine_info, sink_error, sink_info, sink_warn, LogSink};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use skraper_core::{update, TaskEffect, TaskMsg, TaskState};
use tokio_util::sync::CancellationToken;

use crate::TaskError;

type Work = dyn Fn(TaskContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Handed to the wrapped work for one run; carries that run's cancellation
/// signal.
#[derive(Debug, Clone)]
pub struct TaskContext {
    owner: Arc<str>,
    token: CancellationToken,
}

impl TaskContext {
    pub fn new(owner: impl Into<Arc<str>>, token: CancellationToken) -> Self {
        Self {
            owner: owner.into(),
            token,
        }
    }

    /// Context with its own signal, for driving engines outside a task.
    pub fn detached(owner: impl Into<Arc<str>>) -> Self {
        Self::new(owner, CancellationToken::new())
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Sleeps for `duration` unless cancellation is requested first.
    ///
    /// Returns `true` when the whole duration elapsed, `false` when the sleep
    /// was cut short (or skipped) by cancellation.
    pub async fn sleep_or_exit(&self, duration: Duration) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        if duration.is_zero() {
            return true;
        }
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

/// Fault raised by a worker and captured by its task.
#[derive(Clone)]
pub struct TaskFault {
    pub owner: String,
    pub error: Arc<anyhow::Error>,
}

impl fmt::Debug for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFault")
            .field("owner", &self.owner)
            .field("error", &format_args!("{:#}", self.error))
            .finish()
    }
}

impl fmt::Display for TaskFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task '{}' faulted: {:#}", self.owner, self.error)
    }
}

/// Notifications delivered to subscribers of a task.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    StateChanged { owner: String, state: TaskState },
    Faulted(TaskFault),
}

struct Status {
    state: TaskState,
    last_error: Option<Arc<anyhow::Error>>,
    token: CancellationToken,
    /// Bumped on every launch and every cancel; exits from older runs no
    /// longer move the state.
    generation: u64,
    active: usize,
}

struct Shared {
    owner: String,
    log: Arc<dyn LogSink>,
    status: Mutex<Status>,
    exited: Condvar,
    subscribers: Mutex<Vec<mpsc::Sender<TaskEvent>>>,
}

impl Shared {
    fn lock_status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: TaskEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn announce(&self, state: TaskState) {
        sink_info!(self.log, "Task '{}' {}", self.owner, state);
        self.publish(TaskEvent::StateChanged {
            owner: self.owner.clone(),
            state,
        });
    }

    fn await_exit(&self) {
        let mut status = self.lock_status();
        while status.active > 0 {
            status = self
                .exited
                .wait(status)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Called on the worker thread once the work has returned.
    fn finish(&self, generation: u64, outcome: anyhow::Result<()>) {
        let (msg, error) = match outcome {
            Ok(()) => (TaskMsg::WorkExited, None),
            Err(err) => (TaskMsg::WorkFaulted, Some(Arc::new(err))),
        };

        let mut status = self.lock_status();
        if status.generation == generation {
            if let Ok((next, effects)) = update(status.state, msg) {
                if next != status.state {
                    status.state = next;
                    self.announce(next);
                }
                if let (true, Some(error)) = (effects.contains(&TaskEffect::PublishFault), error) {
                    sink_error!(self.log, "Task '{}' faulted: {:#}", self.owner, error);
                    status.last_error = Some(error.clone());
                    self.publish(TaskEvent::Faulted(TaskFault {
                        owner: self.owner.clone(),
                        error,
                    }));
                }
            }
        } else if let Some(error) = error {
            // The run was already stopped; its state is no longer reported.
            sink_warn!(
                self.log,
                "Task '{}' stopped run ended with an error: {:#}",
                self.owner,
                error
            );
        }

        status.active = status.active.saturating_sub(1);
        self.exited.notify_all();
    }
}

struct Control {
    work: Option<Arc<Work>>,
}

/// A unit of work that can be started, stopped, restarted and terminated.
pub struct CancellableTask {
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl CancellableTask {
    pub fn new<F, Fut>(owner: impl Into<String>, log: Arc<dyn LogSink>, work: F) -> Self
    where
        F: Fn(TaskContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let owner = owner.into();
        let work: Arc<Work> = Arc::new(move |ctx| work(ctx).boxed());

        // No run yet: report as cancelled until the first launch.
        let token = CancellationToken::new();
        token.cancel();

        let shared = Arc::new(Shared {
            owner,
            log,
            status: Mutex::new(Status {
                state: TaskState::Created,
                last_error: None,
                token,
                generation: 0,
                active: 0,
            }),
            exited: Condvar::new(),
            subscribers: Mutex::new(Vec::new()),
        });
        shared.announce(TaskState::Created);

        Self {
            shared,
            control: Mutex::new(Control { work: Some(work) }),
        }
    }

    pub fn owner(&self) -> &str {
        &self.shared.owner
    }

    pub fn state(&self) -> TaskState {
        self.shared.lock_status().state
    }

    pub fn last_error(&self) -> Option<Arc<anyhow::Error>> {
        self.shared.lock_status().last_error.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.lock_status().token.is_cancelled()
    }

    /// Receives every state change and every captured fault from now on.
    pub fn subscribe(&self) -> mpsc::Receiver<TaskEvent> {
        let (tx, rx) = mpsc::channel();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Launches the work unless it is already running.
    pub fn start(&self) -> Result<(), TaskError> {
        let mut control = self.lock_control();
        if self.state() == TaskState::Running {
            sink_info!(self.shared.log, "Task '{}' already running!", self.owner());
            return Ok(());
        }
        self.dispatch(&mut control, TaskMsg::Start)
    }

    /// Requests cancellation; with `wait_for_completion` also blocks until the
    /// worker has observed it and returned.
    pub fn stop(&self, wait_for_completion: bool) {
        let mut control = self.lock_control();
        let msg = TaskMsg::Stop {
            wait: wait_for_completion,
        };
        if let Err(err) = self.dispatch(&mut control, msg) {
            sink_error!(self.shared.log, "{}", err);
        }
    }

    /// Stop-and-wait followed by a start, without releasing the lifecycle lock.
    pub fn restart(&self) -> Result<(), TaskError> {
        let mut control = self.lock_control();
        sink_info!(self.shared.log, "Task '{}' restarting", self.owner());
        self.dispatch(&mut control, TaskMsg::Restart)
    }

    /// Stops, waits for the worker and drops the work. Idempotent.
    pub fn terminate(&self) {
        let mut control = self.lock_control();
        if let Err(err) = self.dispatch(&mut control, TaskMsg::Terminate) {
            sink_error!(self.shared.log, "{}", err);
        }
    }

    /// Blocks until no worker of this task is running.
    pub fn wait(&self) {
        self.shared.await_exit();
    }

    /// Blocks until every given task has no running worker.
    pub fn wait_all(tasks: &[&CancellableTask]) {
        let started: Vec<_> = tasks
            .iter()
            .filter(|task| task.state() != TaskState::Created)
            .collect();
        for task in &started {
            task.wait();
        }
        engine_info!("Cancellable tasks ({}) properly terminated", started.len());
    }

    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, control: &mut Control, msg: TaskMsg) -> Result<(), TaskError> {
        let effects = {
            let mut status = self.shared.lock_status();
            let (next, effects) = update(status.state, msg).map_err(|err| {
                let err = TaskError::lifecycle(self.owner(), err);
                sink_error!(self.shared.log, "{}", err);
                err
            })?;
            if next != status.state {
                status.state = next;
                self.shared.announce(next);
            }
            effects
        };

        for effect in effects {
            self.apply(control, effect)?;
        }
        Ok(())
    }

    fn apply(&self, control: &mut Control, effect: TaskEffect) -> Result<(), TaskError> {
        match effect {
            TaskEffect::Launch => self.launch(control),
            TaskEffect::Cancel => {
                let mut status = self.shared.lock_status();
                status.token.cancel();
                status.generation += 1;
                Ok(())
            }
            TaskEffect::AwaitExit => {
                self.shared.await_exit();
                Ok(())
            }
            TaskEffect::Release => {
                control.work = None;
                Ok(())
            }
            // Only produced for worker exits, which `Shared::finish` handles.
            TaskEffect::PublishFault => Ok(()),
        }
    }

    fn launch(&self, control: &mut Control) -> Result<(), TaskError> {
        let Some(work) = control.work.clone() else {
            return Ok(());
        };

        let token = CancellationToken::new();
        let generation = {
            let mut status = self.shared.lock_status();
            status.token = token.clone();
            status.generation += 1;
            status.active += 1;
            status.generation
        };

        let ctx = TaskContext::new(self.owner(), token);
        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(format!("task-{}", self.owner()))
            .spawn(move || {
                let outcome = run_work(work.as_ref(), ctx);
                shared.finish(generation, outcome);
            });

        match spawned {
            Ok(_) => Ok(()),
            Err(source) => {
                let mut status = self.shared.lock_status();
                status.active = status.active.saturating_sub(1);
                status.last_error = Some(Arc::new(anyhow!("failed to spawn worker: {source}")));
                status.state = TaskState::Faulted;
                self.shared.announce(TaskState::Faulted);
                self.shared.exited.notify_all();
                Err(TaskError::Spawn {
                    owner: self.owner().to_string(),
                    source,
                })
            }
        }
    }
}

fn run_work(work: &Work, ctx: TaskContext) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build worker runtime")?;

    let run = async move { work(ctx).await };
    match runtime.block_on(AssertUnwindSafe(run).catch_unwind()) {
        Ok(outcome) => outcome,
        Err(payload) => Err(anyhow!("worker panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
