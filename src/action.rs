//! Actions: gated, serialized units of work.

use crate::error::ActionError;
use crate::{Event, MutableProperty, NoError, Observer, Property, Signal, SignalProducer};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Execute<I, O, E> = dyn Fn(I) -> SignalProducer<O, E> + Send + Sync;

struct ActionInner<I, O, E> {
    execute: Box<Execute<I, O, E>>,
    enabled: Property<bool>,
    running: AtomicBool,
    executing: MutableProperty<bool>,
    events: Signal<Event<O, E>, NoError>,
    events_sink: Observer<Event<O, E>, NoError>,
    values: Signal<O, NoError>,
    errors: Signal<E, NoError>,
}

impl<I, O, E> ActionInner<I, O, E>
where
    O: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Claim the action for one execution.
    fn begin(&self) -> bool {
        if !self.enabled.value() {
            return false;
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.executing.set(true);
        true
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
        self.executing.set(false);
    }
}

impl<I, O, E> Drop for ActionInner<I, O, E> {
    fn drop(&mut self) {
        self.events_sink.send_completed();
    }
}

/// A unit of work that can be applied to inputs, one execution at a time.
///
/// Applying an action builds a producer from the input. While one
/// application is running, or while the `enabled_if` property is `false`,
/// further applications fail with [`ActionError::NotEnabled`]. Every event
/// of every execution is also forwarded to [`events`](Action::events), and
/// from there to [`values`](Action::values) and [`errors`](Action::errors).
///
/// # Examples
///
/// ```rust,no_run
/// use reactive_signals::prelude::*;
///
/// let action = Action::new(|input: String| SignalProducer::<String, NoError>::value(format!("hi {input}")));
/// action.values().observe_next(|output| println!("{output}"));
/// action.apply("Pedro".to_string()).start_with(|_| {});
/// ```
pub struct Action<I, O, E> {
    inner: Arc<ActionInner<I, O, E>>,
}

impl<I, O, E> Clone for Action<I, O, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I, O, E> Action<I, O, E>
where
    I: Clone + Send + Sync + 'static,
    O: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// An action that is always enabled while idle.
    pub fn new(execute: impl Fn(I) -> SignalProducer<O, E> + Send + Sync + 'static) -> Self {
        Self::enabled_if(Property::constant(true), execute)
    }

    /// An action that is enabled only while `enabled` holds `true`.
    pub fn enabled_if(
        enabled: Property<bool>,
        execute: impl Fn(I) -> SignalProducer<O, E> + Send + Sync + 'static,
    ) -> Self {
        let (events, events_sink) = Signal::pipe();

        let (values, values_sink) = Signal::pipe();
        events.observe_with(move |event: Event<Event<O, E>, NoError>| match event {
            Event::Next(Event::Next(value)) => values_sink.send_next(value),
            Event::Next(_) => {}
            _ => values_sink.send_completed(),
        });

        let (errors, errors_sink) = Signal::pipe();
        events.observe_with(move |event: Event<Event<O, E>, NoError>| match event {
            Event::Next(Event::Failed(error)) => errors_sink.send_next(error),
            Event::Next(_) => {}
            _ => errors_sink.send_completed(),
        });

        Self {
            inner: Arc::new(ActionInner {
                execute: Box::new(execute),
                enabled,
                running: AtomicBool::new(false),
                executing: MutableProperty::new(false),
                events,
                events_sink,
                values,
                errors,
            }),
        }
    }

    /// Build a producer that executes the action for `input` when started.
    ///
    /// Each start is one application: it fails with
    /// [`ActionError::NotEnabled`] if the action is disabled or busy at that
    /// moment.
    pub fn apply(&self, input: I) -> SignalProducer<O, ActionError<E>> {
        let inner = Arc::clone(&self.inner);
        SignalProducer::new(move |observer, disposable| {
            if !inner.begin() {
                tracing::debug!("action applied while not enabled");
                observer.send_failed(ActionError::NotEnabled);
                return;
            }

            let work = (inner.execute)(input.clone());
            let inner = Arc::clone(&inner);
            let handle = work.start(Observer::new(move |event: Event<O, E>| {
                inner.events_sink.send_next(event.clone());
                if event.is_terminal() {
                    inner.finish();
                }
                observer.send(event.map_err(ActionError::Producer));
            }));
            disposable.add(handle);
        })
    }

    /// Every event of every execution.
    pub fn events(&self) -> Signal<Event<O, E>, NoError> {
        self.inner.events.clone()
    }

    /// Values sent by executions.
    pub fn values(&self) -> Signal<O, NoError> {
        self.inner.values.clone()
    }

    /// Errors of failed executions.
    pub fn errors(&self) -> Signal<E, NoError> {
        self.inner.errors.clone()
    }

    /// Whether an execution is running.
    pub fn is_executing(&self) -> Property<bool> {
        self.inner.executing.read_only()
    }

    /// Whether an application started now would run.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.value() && !self.inner.running.load(Ordering::Acquire)
    }
}

impl<I, O, E> fmt::Debug for Action<I, O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("executing", &self.inner.running.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}
