//! Pipe configuration.

/// How much history a pipe keeps for observers that subscribe late.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Replay {
    /// Nothing is replayed; observing a terminated signal is a no-op.
    #[default]
    None,
    /// Up to `n` most recent values plus the terminal event.
    Bounded(usize),
    /// Every value ever sent plus the terminal event.
    Unbounded,
}

/// Settings for [`Signal::pipe_with`](crate::Signal::pipe_with).
///
/// The default is an unlabeled pipe without replay, equivalent to
/// [`Signal::pipe`](crate::Signal::pipe).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipeConfig {
    /// Attached to every log record the pipe emits.
    pub label: Option<&'static str>,
    /// Replay policy for late observers.
    pub replay: Replay,
}

impl PipeConfig {
    /// Attach `label` to the pipe's log records.
    pub fn labeled(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Use `replay` for late observers.
    pub fn with_replay(mut self, replay: Replay) -> Self {
        self.replay = replay;
        self
    }
}
