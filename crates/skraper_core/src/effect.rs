/// Side effects the engine performs, in order, after a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEffect {
    /// Create a fresh cancellation signal and run the work on a new worker.
    Launch,
    /// Raise the cancellation signal of the current worker.
    Cancel,
    /// Block until every outstanding worker has exited.
    AwaitExit,
    /// Drop the reference to the unit of work.
    Release,
    /// Notify fault subscribers.
    PublishFault,
}
