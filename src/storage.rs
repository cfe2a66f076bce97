//! Observer registry backing every signal.
//!
//! Observers live in a slot map with generational keys, so the handle a
//! subscription keeps for removal can never hit an observer that was
//! registered later into a reused slot. A separate key list preserves
//! subscription order for fan out.

use crate::config::Replay;
use crate::{Event, Observer};
use slotmap::{new_key_type, SlotMap};
use std::collections::VecDeque;

new_key_type! {
    /// Identity of one registered observer.
    pub(crate) struct ObserverKey;
}

/// Observers, terminal state and replay buffer of a single signal.
pub(crate) struct ObserverRegistry<T, E> {
    observers: SlotMap<ObserverKey, Observer<T, E>>,
    /// Keys in subscription order.
    order: Vec<ObserverKey>,
    /// The terminal event, once one has been sent.
    terminal: Option<Event<T, E>>,
    /// Recent values retained for late observers.
    buffer: VecDeque<T>,
    replay: Replay,
}

impl<T: Clone, E: Clone> ObserverRegistry<T, E> {
    pub fn new(replay: Replay) -> Self {
        Self {
            observers: SlotMap::with_key(),
            order: Vec::new(),
            terminal: None,
            buffer: VecDeque::new(),
            replay,
        }
    }

    pub fn insert(&mut self, observer: Observer<T, E>) -> ObserverKey {
        let key = self.observers.insert(observer);
        self.order.push(key);
        key
    }

    pub fn remove(&mut self, key: ObserverKey) -> Option<Observer<T, E>> {
        let removed = self.observers.remove(key)?;
        self.order.retain(|k| *k != key);
        Some(removed)
    }

    pub fn get(&self, key: ObserverKey) -> Option<Observer<T, E>> {
        self.observers.get(key).cloned()
    }

    /// Snapshot of the current keys in subscription order.
    pub fn keys(&self) -> Vec<ObserverKey> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminal.is_some()
    }

    /// Retain a value for replay according to the replay policy.
    pub fn record_next(&mut self, value: &T) {
        let capacity = match self.replay {
            Replay::None => return,
            Replay::Bounded(capacity) => capacity,
            Replay::Unbounded => usize::MAX,
        };
        if capacity == 0 {
            return;
        }
        if self.buffer.len() == capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value.clone());
    }

    /// Store the terminal event and hand back every observer, in order,
    /// leaving the registry empty.
    pub fn terminate(&mut self, terminal: Event<T, E>) -> Vec<Observer<T, E>> {
        debug_assert!(terminal.is_terminal());
        self.terminal = Some(terminal);
        let order = std::mem::take(&mut self.order);
        let mut observers = std::mem::take(&mut self.observers);
        order
            .into_iter()
            .filter_map(|key| observers.remove(key))
            .collect()
    }

    /// Events a newly registered observer receives before live events.
    pub fn replay_events(&self) -> Vec<Event<T, E>> {
        if matches!(self.replay, Replay::None) {
            return Vec::new();
        }
        self.buffer
            .iter()
            .cloned()
            .map(Event::Next)
            .chain(self.terminal.iter().cloned())
            .collect()
    }
}
