//! Operators over producers, and the observer transforms they share with
//! signals.

use crate::{Disposable, Event, Observer, SignalProducer};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// How [`SignalProducer::flat_map`] combines inner producers.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlattenStrategy {
    /// Run inner producers one at a time, in the order their outer values
    /// arrived. An inner producer starts only after the previous one
    /// completed.
    Concat,
}

pub(crate) fn mapping<T, U, E, G>(downstream: Observer<U, E>, transform: Arc<G>) -> Observer<T, E>
where
    G: Fn(T) -> U + Send + Sync + 'static + ?Sized,
    T: 'static,
    U: 'static,
    E: 'static,
{
    Observer::new(move |event: Event<T, E>| downstream.send(event.map(|value| transform(value))))
}

pub(crate) fn mapping_err<T, E, F, H>(downstream: Observer<T, F>, transform: Arc<H>) -> Observer<T, E>
where
    H: Fn(E) -> F + Send + Sync + 'static + ?Sized,
    T: 'static,
    E: 'static,
    F: 'static,
{
    Observer::new(move |event: Event<T, E>| downstream.send(event.map_err(|error| transform(error))))
}

pub(crate) fn filtering<T, E, P>(downstream: Observer<T, E>, predicate: Arc<P>) -> Observer<T, E>
where
    P: Fn(&T) -> bool + Send + Sync + 'static + ?Sized,
    T: 'static,
    E: 'static,
{
    Observer::new(move |event: Event<T, E>| match event {
        Event::Next(value) if !predicate(&value) => {}
        event => downstream.send(event),
    })
}

pub(crate) fn ignoring_nil<T, E>(downstream: Observer<T, E>) -> Observer<Option<T>, E>
where
    T: 'static,
    E: 'static,
{
    Observer::new(move |event: Event<Option<T>, E>| match event {
        Event::Next(Some(value)) => downstream.send_next(value),
        Event::Next(None) => {}
        terminal => {
            if let Some(terminal) = terminal.into_terminal() {
                downstream.send(terminal);
            }
        }
    })
}

impl<T, E> SignalProducer<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Build a producer that, per start, wraps the downstream observer with
    /// `transform` and starts this producer with the result.
    ///
    /// Every other operator is built on this.
    pub fn lift<U, F>(
        &self,
        transform: impl Fn(Observer<U, F>) -> Observer<T, E> + Send + Sync + 'static,
    ) -> SignalProducer<U, F>
    where
        U: Clone + Send + 'static,
        F: Clone + Send + 'static,
    {
        let upstream = self.clone();
        SignalProducer::new(move |observer, disposable| {
            disposable.add(upstream.start(transform(observer)));
        })
    }

    /// Transform every value.
    pub fn map<U>(&self, transform: impl Fn(T) -> U + Send + Sync + 'static) -> SignalProducer<U, E>
    where
        U: Clone + Send + 'static,
    {
        let transform = Arc::new(transform);
        self.lift(move |observer| mapping(observer, Arc::clone(&transform)))
    }

    /// Transform the error of a failure.
    pub fn map_err<F>(&self, transform: impl Fn(E) -> F + Send + Sync + 'static) -> SignalProducer<T, F>
    where
        F: Clone + Send + 'static,
    {
        let transform = Arc::new(transform);
        self.lift(move |observer| mapping_err(observer, Arc::clone(&transform)))
    }

    /// Drop values that do not satisfy `predicate`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> SignalProducer<T, E> {
        let predicate = Arc::new(predicate);
        self.lift(move |observer| filtering(observer, Arc::clone(&predicate)))
    }

    /// Map each value to an inner producer and flatten the inner events.
    ///
    /// With [`FlattenStrategy::Concat`] inner producers run strictly one at
    /// a time. Values arriving while an inner producer is active are queued;
    /// their producers start, in order, as earlier ones complete. The result
    /// completes once the outer producer and every queued inner producer
    /// have completed. A failure or interruption of any of them terminates
    /// the result.
    pub fn flat_map<U>(
        &self,
        strategy: FlattenStrategy,
        transform: impl Fn(T) -> SignalProducer<U, E> + Send + Sync + 'static,
    ) -> SignalProducer<U, E>
    where
        U: Clone + Send + 'static,
    {
        match strategy {
            FlattenStrategy::Concat => self.concat_map(Arc::new(transform)),
        }
    }

    fn concat_map<U, G>(&self, transform: Arc<G>) -> SignalProducer<U, E>
    where
        U: Clone + Send + 'static,
        G: Fn(T) -> SignalProducer<U, E> + Send + Sync + 'static,
    {
        let upstream = self.clone();
        SignalProducer::new(move |observer, disposable| {
            let concat = Arc::new(Concat::new(observer, disposable.clone()));
            {
                let concat = Arc::clone(&concat);
                disposable.add_action(move || concat.cancel());
            }

            let transform = Arc::clone(&transform);
            let outer = Arc::clone(&concat);
            let handle = upstream.start(Observer::new(move |event| match event {
                Event::Next(value) => outer.enqueue(transform(value)),
                Event::Completed => outer.outer_completed(),
                Event::Failed(error) => outer.observer.send_failed(error),
                Event::Interrupted => outer.observer.send_interrupted(),
            }));
            disposable.add(handle);
        })
    }
}

impl<T, E> SignalProducer<Option<T>, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Drop absent values and unwrap present ones.
    pub fn ignore_nil(&self) -> SignalProducer<T, E> {
        self.lift(ignoring_nil)
    }
}

struct ConcatState<U, E> {
    queue: VecDeque<SignalProducer<U, E>>,
    /// Id of the running inner producer.
    active: Option<u64>,
    next_id: u64,
    current: Option<Disposable>,
    outer_completed: bool,
    /// Set while a `drain` loop is on some stack. Nested calls leave the
    /// work to that loop so the stack stays flat however long the queue is.
    draining: bool,
}

/// Drives one start of a concat flat map.
struct Concat<U, E> {
    state: Mutex<ConcatState<U, E>>,
    observer: Observer<U, E>,
    disposable: Disposable,
}

impl<U, E> Concat<U, E>
where
    U: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn new(observer: Observer<U, E>, disposable: Disposable) -> Self {
        Self {
            state: Mutex::new(ConcatState {
                queue: VecDeque::new(),
                active: None,
                next_id: 0,
                current: None,
                outer_completed: false,
                draining: false,
            }),
            observer,
            disposable,
        }
    }

    fn enqueue(self: &Arc<Self>, inner: SignalProducer<U, E>) {
        if self.disposable.is_disposed() {
            return;
        }
        self.state.lock().queue.push_back(inner);
        self.drain();
    }

    fn outer_completed(self: &Arc<Self>) {
        self.state.lock().outer_completed = true;
        self.drain();
    }

    fn inner_completed(self: &Arc<Self>, id: u64) {
        {
            let mut state = self.state.lock();
            if state.active != Some(id) {
                return;
            }
            state.active = None;
            state.current = None;
        }
        self.drain();
    }

    /// Start queued inner producers one after another until one is still
    /// running, or complete once the queue and the outer producer are done.
    fn drain(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        loop {
            let (id, inner) = {
                let mut state = self.state.lock();
                if state.active.is_some() || self.disposable.is_disposed() {
                    state.draining = false;
                    return;
                }
                match state.queue.pop_front() {
                    Some(inner) => {
                        let id = state.next_id;
                        state.next_id += 1;
                        state.active = Some(id);
                        (id, inner)
                    }
                    None => {
                        state.draining = false;
                        let finished = state.outer_completed;
                        drop(state);
                        if finished {
                            self.observer.send_completed();
                        }
                        return;
                    }
                }
            };

            tracing::trace!(id, "starting inner producer");
            let this = Arc::clone(self);
            let handle = inner.start(Observer::new(move |event| match event {
                Event::Completed => this.inner_completed(id),
                event => this.observer.send(event),
            }));

            let mut state = self.state.lock();
            if state.active == Some(id) && !self.disposable.is_disposed() {
                state.current = Some(handle);
            } else {
                drop(state);
                handle.dispose();
            }
        }
    }

    fn cancel(&self) {
        let current = {
            let mut state = self.state.lock();
            state.queue.clear();
            state.current.take()
        };
        if let Some(current) = current {
            current.dispose();
        }
    }
}
