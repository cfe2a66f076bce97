//! The write side of a stream.

use crate::Event;
use std::fmt;
use std::sync::Arc;

/// Pushes events into a stream.
///
/// An observer is either built around a callback with [`Observer::new`], or
/// handed out by a pipe, in which case every event is forwarded to the
/// pipe's signal. Observers are cheap to clone; clones share the same sink.
///
/// Pipe-backed observers ignore anything sent after a terminal event.
pub struct Observer<T, E> {
    action: Arc<dyn Fn(Event<T, E>) + Send + Sync>,
}

impl<T, E> Clone for Observer<T, E> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
        }
    }
}

impl<T: 'static, E: 'static> Observer<T, E> {
    /// Create an observer that hands every event to `action`.
    pub fn new(action: impl Fn(Event<T, E>) + Send + Sync + 'static) -> Self {
        Self {
            action: Arc::new(action),
        }
    }

    /// Create an observer that only reacts to values.
    pub fn with_next(on_next: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self::new(move |event| {
            if let Event::Next(value) = event {
                on_next(value);
            }
        })
    }
}

impl<T, E> Observer<T, E> {
    /// Send an arbitrary event.
    pub fn send(&self, event: Event<T, E>) {
        (self.action)(event);
    }

    /// Send a value.
    pub fn send_next(&self, value: T) {
        self.send(Event::Next(value));
    }

    /// Fail the stream with `error`.
    pub fn send_failed(&self, error: E) {
        self.send(Event::Failed(error));
    }

    /// Complete the stream.
    pub fn send_completed(&self) {
        self.send(Event::Completed);
    }

    /// Interrupt the stream.
    pub fn send_interrupted(&self) {
        self.send(Event::Interrupted);
    }
}

impl<T, E> fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").finish_non_exhaustive()
    }
}
