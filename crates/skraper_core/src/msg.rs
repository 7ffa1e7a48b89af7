#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMsg {
    /// Owner asked the task to run.
    Start,
    /// Owner asked the task to stop; `wait` blocks until the worker observes it.
    Stop { wait: bool },
    /// Owner asked for a stop-and-wait followed by a start.
    Restart,
    /// Owner asked for a final stop; the task can never run again.
    Terminate,
    /// The worker returned normally.
    WorkExited,
    /// The worker returned an error or panicked.
    WorkFaulted,
}
