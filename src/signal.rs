//! Core Signal type and operations.

use crate::config::PipeConfig;
use crate::operators::{filtering, ignoring_nil, mapping, mapping_err};
use crate::storage::ObserverRegistry;
use crate::stream::EventStream;
use crate::{Disposable, Event, Observer};
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared state behind every clone of a [`Signal`].
pub(crate) struct SignalCore<T, E> {
    registry: Mutex<ObserverRegistry<T, E>>,
    /// Serializes sends. Reentrant so an observer may send into the signal
    /// it is observing.
    send_lock: ReentrantMutex<()>,
    /// Disposed once the terminal event has been delivered.
    on_terminate: Disposable,
    label: Option<&'static str>,
}

impl<T, E> SignalCore<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn label(&self) -> &'static str {
        self.label.unwrap_or("signal")
    }

    fn send(&self, event: Event<T, E>) {
        let _serial = self.send_lock.lock();
        match event {
            Event::Next(value) => {
                let keys = {
                    let mut registry = self.registry.lock();
                    if registry.is_terminated() {
                        tracing::debug!(label = self.label(), "ignoring next after termination");
                        return;
                    }
                    registry.record_next(&value);
                    registry.keys()
                };

                // No lock is held while observers run. Each key is looked up
                // again so observers disposed mid fan-out are skipped.
                for key in keys {
                    let observer = self.registry.lock().get(key);
                    if let Some(observer) = observer {
                        observer.send(Event::Next(value.clone()));
                    }
                }
            }
            terminal => {
                let observers = {
                    let mut registry = self.registry.lock();
                    if registry.is_terminated() {
                        tracing::debug!(
                            label = self.label(),
                            event = terminal.as_label(),
                            "ignoring terminal event after termination"
                        );
                        return;
                    }
                    registry.terminate(terminal.clone())
                };

                tracing::trace!(
                    label = self.label(),
                    event = terminal.as_label(),
                    observers = observers.len(),
                    "signal terminated"
                );
                for observer in observers {
                    observer.send(terminal.clone());
                }
                self.on_terminate.dispose();
            }
        }
    }

    fn observe(self: &Arc<Self>, observer: Observer<T, E>) -> Disposable {
        let _serial = self.send_lock.lock();
        let (key, replay) = {
            let mut registry = self.registry.lock();
            let replay = registry.replay_events();
            let key = if registry.is_terminated() {
                None
            } else {
                Some(registry.insert(observer.clone()))
            };
            (key, replay)
        };

        for event in replay {
            observer.send(event);
        }

        let Some(key) = key else {
            tracing::trace!(label = self.label(), "observed a terminated signal");
            return Disposable::disposed();
        };

        tracing::trace!(label = self.label(), "observer added");
        let core: Weak<Self> = Arc::downgrade(self);
        Disposable::from_action(move || {
            if let Some(core) = core.upgrade() {
                // Waits out a send in progress on another thread, so nothing
                // reaches the observer once disposal has returned.
                let _serial = core.send_lock.lock();
                if core.registry.lock().remove(key).is_some() {
                    tracing::trace!(label = core.label(), "observer removed");
                }
            }
        })
    }
}

/// A multicast stream of events.
///
/// Signals are hot: they do not produce anything on their own, they only
/// forward what is pushed into them through their [`Observer`]. Every
/// registered observer receives each value synchronously, in subscription
/// order, on the sending thread. At most one terminal event is ever
/// delivered; afterwards the signal is dead and further sends are ignored.
///
/// Handles are cheap to clone and share the same stream.
///
/// # Examples
///
/// ```rust,no_run
/// use reactive_signals::prelude::*;
///
/// let (signal, observer) = Signal::<i32, NoError>::pipe();
/// signal.observe_next(|value| println!("got {value}"));
/// observer.send_next(1);
/// observer.send_completed();
/// ```
pub struct Signal<T, E> {
    core: Arc<SignalCore<T, E>>,
}

impl<T, E> Clone for Signal<T, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T, E> PartialEq for Signal<T, E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<T, E> Eq for Signal<T, E> {}

impl<T, E> Signal<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a signal and the observer that drives it.
    pub fn pipe() -> (Self, Observer<T, E>) {
        Self::pipe_with(PipeConfig::default())
    }

    /// Create a pipe with explicit settings.
    pub fn pipe_with(config: PipeConfig) -> (Self, Observer<T, E>) {
        let core = Arc::new(SignalCore {
            registry: Mutex::new(ObserverRegistry::new(config.replay)),
            send_lock: ReentrantMutex::new(()),
            on_terminate: Disposable::new(),
            label: config.label,
        });
        let sink = Arc::clone(&core);
        let observer = Observer::new(move |event| sink.send(event));
        (Self { core }, observer)
    }

    /// Create a signal driven by `generator`.
    ///
    /// The generator runs immediately with the signal's observer. A
    /// disposable it returns is disposed when the signal terminates.
    pub fn new(generator: impl FnOnce(Observer<T, E>) -> Option<Disposable>) -> Self {
        let (signal, observer) = Self::pipe();
        if let Some(disposable) = generator(observer) {
            signal.on_terminate(disposable);
        }
        signal
    }

    /// Dispose `disposable` once this signal has terminated.
    pub(crate) fn on_terminate(&self, disposable: Disposable) {
        self.core.on_terminate.add(disposable);
    }

    /// Register an observer.
    ///
    /// Disposing the returned handle removes only this observer. Observing a
    /// terminated signal returns an already disposed handle; with a replay
    /// policy the retained values and the terminal event are delivered first.
    pub fn observe(&self, observer: Observer<T, E>) -> Disposable {
        self.core.observe(observer)
    }

    /// Register a callback for every event.
    pub fn observe_with(&self, callback: impl Fn(Event<T, E>) + Send + Sync + 'static) -> Disposable {
        self.observe(Observer::new(callback))
    }

    /// Register a callback for values only.
    pub fn observe_next(&self, on_next: impl Fn(T) + Send + Sync + 'static) -> Disposable {
        self.observe(Observer::with_next(on_next))
    }

    /// Register a callback for the error of a failure.
    pub fn observe_failed(&self, on_failed: impl Fn(E) + Send + Sync + 'static) -> Disposable {
        self.observe_with(move |event| {
            if let Event::Failed(error) = event {
                on_failed(error);
            }
        })
    }

    /// Register a callback for successful completion.
    pub fn observe_completed(&self, on_completed: impl Fn() + Send + Sync + 'static) -> Disposable {
        self.observe_with(move |event| {
            if matches!(event, Event::Completed) {
                on_completed();
            }
        })
    }

    /// Register a callback for interruption.
    pub fn observe_interrupted(
        &self,
        on_interrupted: impl Fn() + Send + Sync + 'static,
    ) -> Disposable {
        self.observe_with(move |event| {
            if matches!(event, Event::Interrupted) {
                on_interrupted();
            }
        })
    }

    /// Whether a terminal event has been sent.
    pub fn is_terminated(&self) -> bool {
        self.core.registry.lock().is_terminated()
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.core.registry.lock().len()
    }

    /// Build a derived signal fed by an observer registered on this one.
    ///
    /// The registration is removed once the derived signal terminates.
    fn derive<U, F>(&self, transform: impl FnOnce(Observer<U, F>) -> Observer<T, E>) -> Signal<U, F>
    where
        U: Clone + Send + 'static,
        F: Clone + Send + 'static,
    {
        let config = PipeConfig {
            label: self.core.label,
            ..PipeConfig::default()
        };
        let (derived, sink) = Signal::pipe_with(config);
        let subscription = self.observe(transform(sink));
        derived.on_terminate(subscription);
        derived
    }

    /// Transform every value.
    pub fn map<U>(&self, transform: impl Fn(T) -> U + Send + Sync + 'static) -> Signal<U, E>
    where
        U: Clone + Send + 'static,
    {
        self.derive(move |sink| mapping(sink, Arc::new(transform)))
    }

    /// Transform the error of a failure.
    pub fn map_err<F>(&self, transform: impl Fn(E) -> F + Send + Sync + 'static) -> Signal<T, F>
    where
        F: Clone + Send + 'static,
    {
        self.derive(move |sink| mapping_err(sink, Arc::new(transform)))
    }

    /// Drop values that do not satisfy `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Signal<T, E> {
        self.derive(move |sink| filtering(sink, Arc::new(predicate)))
    }

    /// Consume the signal as an asynchronous stream of events.
    pub fn into_stream(&self) -> EventStream<T, E> {
        EventStream::from_signal(self)
    }
}

impl<T, E> Signal<Option<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Drop absent values and unwrap present ones.
    pub fn ignore_nil(&self) -> Signal<T, E> {
        self.derive(ignoring_nil)
    }
}

impl<T, E> fmt::Debug for Signal<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("label", &self.core.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Replay;
    use crate::NoError;
    use parking_lot::Mutex;
    use rand::Rng;

    type Recorded<T, E> = Arc<Mutex<Vec<Event<T, E>>>>;

    fn record<T, E>(signal: &Signal<T, E>) -> (Recorded<T, E>, Disposable)
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        let subscription = signal.observe_with(move |event| events_clone.lock().push(event));
        (events, subscription)
    }

    #[test]
    fn test_signal_fans_out_in_order() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let (first, _) = record(&signal);
        let (second, _) = record(&signal);

        observer.send_next(1);
        observer.send_next(2);
        observer.send_completed();

        let expected = vec![Event::Next(1), Event::Next(2), Event::Completed];
        assert_eq!(*first.lock(), expected);
        assert_eq!(*second.lock(), expected);
    }

    #[test]
    fn test_subscription_order_is_preserved() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..5 {
            let order = order.clone();
            signal.observe_next(move |_| order.lock().push(id));
        }

        observer.send_next(0);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sends_after_terminal_are_ignored() {
        let (signal, observer) = Signal::<i32, &'static str>::pipe();
        let (events, _) = record(&signal);

        observer.send_failed("boom");
        observer.send_next(1);
        observer.send_completed();
        observer.send_failed("again");
        observer.send_interrupted();

        assert_eq!(*events.lock(), vec![Event::Failed("boom")]);
        assert!(signal.is_terminated());
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_disposed_observer_is_skipped() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let (kept, _) = record(&signal);
        let (dropped, subscription) = record(&signal);

        subscription.dispose();
        observer.send_next(1);
        observer.send_completed();

        assert_eq!(*kept.lock(), vec![Event::Next(1), Event::Completed]);
        assert!(dropped.lock().is_empty());
        assert_eq!(signal.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_dispose_itself_while_receiving() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let slot: Arc<Mutex<Option<Disposable>>> = Arc::new(Mutex::new(None));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let subscription = {
            let slot = slot.clone();
            let seen = seen.clone();
            signal.observe_next(move |value| {
                seen.lock().push(value);
                if let Some(subscription) = slot.lock().take() {
                    subscription.dispose();
                }
            })
        };
        *slot.lock() = Some(subscription);

        observer.send_next(1);
        observer.send_next(2);

        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_observer_may_send_into_its_own_signal() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let (events, _) = record(&signal);
        {
            let observer = observer.clone();
            signal.observe_next(move |value| {
                if value == 1 {
                    observer.send_completed();
                }
            });
        }

        observer.send_next(1);
        observer.send_next(2);

        assert_eq!(*events.lock(), vec![Event::Next(1), Event::Completed]);
    }

    #[test]
    fn test_observing_terminated_signal_without_replay() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        observer.send_next(1);
        observer.send_completed();

        let (events, subscription) = record(&signal);
        assert!(events.lock().is_empty());
        assert!(subscription.is_disposed());
    }

    #[test]
    fn test_replaying_pipe_delivers_history_to_late_observers() {
        let config = PipeConfig::default().with_replay(Replay::Bounded(2));
        let (signal, observer) = Signal::<&str, NoError>::pipe_with(config);
        observer.send_next("a");
        observer.send_next("b");
        observer.send_next("c");

        let (live, _) = record(&signal);
        observer.send_next("d");
        observer.send_completed();

        let (late, _) = record(&signal);
        assert_eq!(
            *live.lock(),
            vec![Event::Next("b"), Event::Next("c"), Event::Next("d"), Event::Completed]
        );
        assert_eq!(
            *late.lock(),
            vec![Event::Next("c"), Event::Next("d"), Event::Completed]
        );
    }

    #[test]
    fn test_generator_disposable_runs_on_termination() {
        let cleaned = Arc::new(Mutex::new(false));
        let cleaned_clone = cleaned.clone();
        let sink: Arc<Mutex<Option<Observer<i32, NoError>>>> = Arc::new(Mutex::new(None));
        let sink_clone = sink.clone();

        let signal = Signal::new(move |observer| {
            *sink_clone.lock() = Some(observer);
            Some(Disposable::from_action(move || *cleaned_clone.lock() = true))
        });
        let (events, _) = record(&signal);

        let observer = sink.lock().clone().unwrap();
        observer.send_next(7);
        assert!(!*cleaned.lock());
        observer.send_completed();

        assert!(*cleaned.lock());
        assert_eq!(*events.lock(), vec![Event::Next(7), Event::Completed]);
    }

    #[test]
    fn test_map_and_filter() {
        let (integers, observer) = Signal::<i32, NoError>::pipe();
        let sum = integers.map(|v| v + 2).filter(|v| v % 2 == 0);
        let (events, _) = record(&sum);

        for value in 0..5 {
            observer.send_next(value);
        }
        observer.send_completed();

        assert_eq!(
            *events.lock(),
            vec![Event::Next(2), Event::Next(4), Event::Next(6), Event::Completed]
        );
    }

    #[test]
    fn test_map_err_and_ignore_nil() {
        let (signal, observer) = Signal::<Option<i32>, &'static str>::pipe();
        let derived = signal.ignore_nil().map_err(str::len);
        let (events, _) = record(&derived);

        observer.send_next(None);
        observer.send_next(Some(3));
        observer.send_failed("boom");

        assert_eq!(*events.lock(), vec![Event::Next(3), Event::Failed(4)]);
    }

    #[test]
    fn test_derived_signal_detaches_after_termination() {
        let (source, observer) = Signal::<i32, NoError>::pipe();
        let derived = source.map(|v| v * 2);
        assert_eq!(source.observer_count(), 1);

        observer.send_completed();
        assert!(derived.is_terminated());
        assert_eq!(source.observer_count(), 0);
    }

    #[test]
    fn test_random_sends_and_disposals_keep_order() {
        let mut rng = rand::thread_rng();
        let (signal, observer) = Signal::<u32, NoError>::pipe();
        let mut subscribers = Vec::new();
        for _ in 0..8 {
            subscribers.push(record(&signal));
        }

        let mut sent = Vec::new();
        let mut disposed_at = vec![None; subscribers.len()];
        for step in 0..200u32 {
            if rng.gen_bool(0.05) {
                let index = rng.gen_range(0..subscribers.len());
                if disposed_at[index].is_none() {
                    subscribers[index].1.dispose();
                    disposed_at[index] = Some(sent.len());
                }
            }
            observer.send_next(step);
            sent.push(step);
        }

        for ((events, _), disposed_at) in subscribers.iter().zip(disposed_at) {
            let expected: Vec<_> = sent[..disposed_at.unwrap_or(sent.len())]
                .iter()
                .copied()
                .map(Event::Next)
                .collect();
            assert_eq!(*events.lock(), expected);
        }
    }

    #[test]
    fn test_observers_come_and_go_while_another_thread_sends() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let (signal, observer) = Signal::<u64, NoError>::pipe();
        let running = Arc::new(AtomicBool::new(true));
        let sender = {
            let running = running.clone();
            std::thread::spawn(move || {
                let mut next = 0;
                while running.load(Ordering::Acquire) {
                    observer.send_next(next);
                    next += 1;
                }
            })
        };

        let subscribers: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                std::thread::spawn(move || {
                    let mut runs = Vec::new();
                    for _ in 0..50 {
                        let (events, subscription) = record(&signal);
                        std::thread::yield_now();
                        subscription.dispose();
                        let seen_at_dispose = events.lock().len();
                        runs.push((events, seen_at_dispose));
                    }
                    runs
                })
            })
            .collect();
        let runs: Vec<_> = subscribers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();

        running.store(false, Ordering::Release);
        sender.join().unwrap();

        assert_eq!(signal.observer_count(), 0);
        for (events, seen_at_dispose) in runs {
            let values: Vec<u64> = events.lock().iter().filter_map(|e| e.value().copied()).collect();
            assert_eq!(values.len(), seen_at_dispose);
            assert!(values.windows(2).all(|pair| pair[1] == pair[0] + 1));
        }
    }

    #[test]
    fn test_concurrent_senders_deliver_every_value_once() {
        let (signal, observer) = Signal::<usize, NoError>::pipe();
        let (events, _) = record(&signal);

        let handles: Vec<_> = (0..4)
            .map(|thread| {
                let observer = observer.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        observer.send_next(thread * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        observer.send_completed();

        let events = events.lock();
        assert_eq!(events.len(), 401);
        assert_eq!(events.last(), Some(&Event::Completed));
        let mut values: Vec<_> = events.iter().filter_map(|e| e.value().copied()).collect();
        values.sort_unstable();
        assert_eq!(values, (0..400).collect::<Vec<_>>());
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_ignored_send_is_logged() {
        let config = PipeConfig::default().labeled("gps");
        let (_signal, observer) = Signal::<i32, NoError>::pipe_with(config);
        observer.send_completed();
        observer.send_next(1);

        assert!(logs_contain("ignoring next after termination"));
        assert!(logs_contain("gps"));
    }
}
