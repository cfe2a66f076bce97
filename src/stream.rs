//! Consuming signals and producers as `futures` streams.

use crate::{Event, Observer, ScopedDisposable, Signal, SignalProducer};
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// An asynchronous stream of the events of a signal or producer start.
///
/// The stream yields every event, including the terminal one, and ends
/// right after it. Dropping the stream disposes the underlying
/// subscription; for a producer this interrupts the start.
pub struct EventStream<T, E> {
    receiver: mpsc::UnboundedReceiver<Event<T, E>>,
    _subscription: ScopedDisposable,
    finished: bool,
}

impl<T, E> EventStream<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn channel() -> (Observer<T, E>, mpsc::UnboundedReceiver<Event<T, E>>) {
        let (tx, rx) = mpsc::unbounded();
        // The receiver may already be gone; events are dropped then.
        let observer = Observer::new(move |event| {
            let _ = tx.unbounded_send(event);
        });
        (observer, rx)
    }

    pub(crate) fn from_signal(signal: &Signal<T, E>) -> Self {
        let (observer, receiver) = Self::channel();
        let subscription = signal.observe(observer);
        Self {
            receiver,
            _subscription: subscription.scoped(),
            finished: false,
        }
    }

    pub(crate) fn from_producer(producer: &SignalProducer<T, E>) -> Self {
        let (observer, receiver) = Self::channel();
        let disposable = producer.start(observer);
        Self {
            receiver,
            _subscription: disposable.scoped(),
            finished: false,
        }
    }
}

impl<T, E> Stream for EventStream<T, E> {
    type Item = Event<T, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.receiver.poll_next_unpin(cx) {
            Poll::Ready(Some(event)) => {
                this.finished = event.is_terminal();
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T, E> fmt::Debug for EventStream<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
