//! Restartable producers of signals.

use crate::config::{PipeConfig, Replay};
use crate::stream::EventStream;
use crate::{Disposable, Event, Observer, Signal};
use std::fmt;
use std::sync::Arc;

type Setup<T, E> = dyn Fn(Observer<T, E>, Disposable) + Send + Sync;

/// A deferred, restartable description of work that produces a [`Signal`].
///
/// Nothing happens until the producer is started. Every call to
/// [`start`](SignalProducer::start) creates a fresh signal, registers the
/// caller's observer on it and then runs the setup closure with the signal's
/// observer and a fresh [`Disposable`]. Starts share no state, so retrying
/// failed work is just starting the producer again.
///
/// # Examples
///
/// ```rust,no_run
/// use reactive_signals::prelude::*;
///
/// let producer = SignalProducer::<&str, NoError>::new(|observer, _disposable| {
///     observer.send_next("Ey ya!");
///     observer.send_completed();
/// });
/// producer.start_with_next(|value| println!("{value}"));
/// ```
pub struct SignalProducer<T, E> {
    setup: Arc<Setup<T, E>>,
}

impl<T, E> Clone for SignalProducer<T, E> {
    fn clone(&self) -> Self {
        Self {
            setup: Arc::clone(&self.setup),
        }
    }
}

impl<T, E> SignalProducer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a producer from a setup closure.
    ///
    /// The closure runs once per start. It should check
    /// [`Disposable::is_disposed`] before doing observable work and may
    /// register cleanup on the disposable it is given.
    pub fn new(setup: impl Fn(Observer<T, E>, Disposable) + Send + Sync + 'static) -> Self {
        Self {
            setup: Arc::new(setup),
        }
    }

    /// Emit `value`, then complete.
    pub fn value(value: T) -> Self
    where
        T: Sync,
    {
        Self::new(move |observer, _| {
            observer.send_next(value.clone());
            observer.send_completed();
        })
    }

    /// Emit the value and complete, or fail, depending on `result`.
    pub fn result(result: Result<T, E>) -> Self
    where
        T: Sync,
        E: Sync,
    {
        Self::new(move |observer, _| match &result {
            Ok(value) => {
                observer.send_next(value.clone());
                observer.send_completed();
            }
            Err(error) => observer.send_failed(error.clone()),
        })
    }

    /// Fail immediately with `error`.
    pub fn error(error: E) -> Self
    where
        E: Sync,
    {
        Self::new(move |observer, _| observer.send_failed(error.clone()))
    }

    /// Complete immediately.
    pub fn empty() -> Self {
        Self::new(|observer, _| observer.send_completed())
    }

    /// Never send anything.
    pub fn never() -> Self {
        Self::new(|_, _| {})
    }

    /// Emit every value in order, then complete.
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self
    where
        T: Sync,
    {
        let values: Vec<T> = values.into_iter().collect();
        Self::new(move |observer, disposable| {
            for value in &values {
                if disposable.is_disposed() {
                    return;
                }
                observer.send_next(value.clone());
            }
            observer.send_completed();
        })
    }

    /// Forward the events of an existing signal for as long as each start lasts.
    pub fn from_signal(signal: Signal<T, E>) -> Self {
        Self::new(move |observer, disposable| {
            disposable.add(signal.observe(observer));
        })
    }

    /// Create a producer backed by a replaying pipe.
    ///
    /// Every start first receives up to `capacity` of the most recent values
    /// sent through the returned observer, plus the terminal event if one was
    /// sent, and then the live events.
    pub fn buffer(capacity: usize) -> (Self, Observer<T, E>) {
        let config = PipeConfig::default().with_replay(Replay::Bounded(capacity));
        let (signal, observer) = Signal::pipe_with(config);
        (Self::from_signal(signal), observer)
    }

    /// Start the producer, handing the fresh signal to `setup_signal` before
    /// the setup closure runs.
    ///
    /// Disposing the returned handle interrupts the signal (if it has not
    /// terminated yet) and disposes everything the setup closure registered.
    /// The handle is disposed automatically once the signal terminates.
    pub fn start_with_signal(&self, setup_signal: impl FnOnce(&Signal<T, E>, &Disposable)) -> Disposable {
        let (signal, observer) = Signal::pipe();
        let disposable = Disposable::new();
        setup_signal(&signal, &disposable);

        signal.on_terminate(disposable.clone());
        {
            let signal = signal.clone();
            let observer = observer.clone();
            disposable.add_action(move || {
                if !signal.is_terminated() {
                    observer.send_interrupted();
                }
            });
        }

        tracing::trace!("starting producer");
        (self.setup)(observer, disposable.clone());
        disposable
    }

    /// Start the producer, delivering its events to `observer`.
    pub fn start(&self, observer: Observer<T, E>) -> Disposable {
        self.start_with_signal(move |signal, _| {
            signal.observe(observer);
        })
    }

    /// Start the producer with a callback for every event.
    pub fn start_with(&self, callback: impl Fn(Event<T, E>) + Send + Sync + 'static) -> Disposable {
        self.start(Observer::new(callback))
    }

    /// Start the producer with a callback for values only.
    pub fn start_with_next(&self, on_next: impl Fn(T) + Send + Sync + 'static) -> Disposable {
        self.start(Observer::with_next(on_next))
    }

    /// Start the producer with a callback for the error of a failure.
    pub fn start_with_failed(&self, on_failed: impl Fn(E) + Send + Sync + 'static) -> Disposable {
        self.start_with(move |event| {
            if let Event::Failed(error) = event {
                on_failed(error);
            }
        })
    }

    /// Start the producer with a callback for successful completion.
    pub fn start_with_completed(&self, on_completed: impl Fn() + Send + Sync + 'static) -> Disposable {
        self.start_with(move |event| {
            if matches!(event, Event::Completed) {
                on_completed();
            }
        })
    }

    /// Start the producer and consume it as an asynchronous stream.
    ///
    /// Dropping the stream disposes the start.
    pub fn into_stream(&self) -> EventStream<T, E> {
        EventStream::from_producer(self)
    }
}

impl<T, E> fmt::Debug for SignalProducer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalProducer").finish_non_exhaustive()
    }
}
