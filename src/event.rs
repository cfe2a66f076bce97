//! Events carried by signals.

use std::fmt;

/// Error type for streams that can never fail.
pub type NoError = std::convert::Infallible;

/// A single event delivered to an [`Observer`](crate::Observer).
///
/// `Failed`, `Completed` and `Interrupted` are terminal: once one of them has
/// been delivered, the stream is over and nothing else follows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event<T, E> {
    /// A value.
    Next(T),
    /// The stream failed with an error.
    Failed(E),
    /// The stream finished successfully.
    Completed,
    /// The stream was cancelled before it could finish.
    Interrupted,
}

impl<T, E> Event<T, E> {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }

    /// The carried value, if this is a `Next` event.
    pub fn value(&self) -> Option<&T> {
        match self {
            Event::Next(value) => Some(value),
            _ => None,
        }
    }

    /// The carried error, if this is a `Failed` event.
    pub fn error(&self) -> Option<&E> {
        match self {
            Event::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Transform the value of a `Next` event, passing terminal events through.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U, E> {
        match self {
            Event::Next(value) => Event::Next(f(value)),
            Event::Failed(error) => Event::Failed(error),
            Event::Completed => Event::Completed,
            Event::Interrupted => Event::Interrupted,
        }
    }

    /// Transform the error of a `Failed` event, passing other events through.
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Event<T, F> {
        match self {
            Event::Next(value) => Event::Next(value),
            Event::Failed(error) => Event::Failed(f(error)),
            Event::Completed => Event::Completed,
            Event::Interrupted => Event::Interrupted,
        }
    }

    /// Short stable label for log records.
    pub fn as_label(&self) -> &'static str {
        match self {
            Event::Next(_) => "next",
            Event::Failed(_) => "failed",
            Event::Completed => "completed",
            Event::Interrupted => "interrupted",
        }
    }

    /// Convert a terminal event into a terminal event of another value type.
    ///
    /// Returns `None` for `Next`.
    pub(crate) fn into_terminal<U>(self) -> Option<Event<U, E>> {
        match self {
            Event::Next(_) => None,
            Event::Failed(error) => Some(Event::Failed(error)),
            Event::Completed => Some(Event::Completed),
            Event::Interrupted => Some(Event::Interrupted),
        }
    }
}

impl<T: fmt::Display, E: fmt::Display> fmt::Display for Event<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Next(value) => write!(f, "next({value})"),
            Event::Failed(error) => write!(f, "failed({error})"),
            Event::Completed => f.write_str("completed"),
            Event::Interrupted => f.write_str("interrupted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(!Event::<i32, ()>::Next(1).is_terminal());
        assert!(Event::<i32, ()>::Failed(()).is_terminal());
        assert!(Event::<i32, ()>::Completed.is_terminal());
        assert!(Event::<i32, ()>::Interrupted.is_terminal());
    }

    #[test]
    fn test_map_only_touches_values() {
        let next: Event<i32, &str> = Event::Next(2);
        assert_eq!(next.map(|v| v * 10), Event::Next(20));

        let failed: Event<i32, &str> = Event::Failed("boom");
        assert_eq!(failed.map(|v| v * 10), Event::Failed("boom"));
    }

    #[test]
    fn test_map_err_only_touches_errors() {
        let failed: Event<i32, &str> = Event::Failed("boom");
        assert_eq!(failed.map_err(str::len), Event::Failed(4));
        assert_eq!(Event::<i32, &str>::Completed.map_err(str::len), Event::Completed);
    }

    #[test]
    fn test_display() {
        assert_eq!(Event::<i32, String>::Next(3).to_string(), "next(3)");
        assert_eq!(Event::<i32, String>::Interrupted.to_string(), "interrupted");
    }
}
