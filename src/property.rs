//! Properties: a current value plus a signal of its changes.

use crate::{Disposable, NoError, Observer, Signal, SignalProducer};
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::{Arc, Weak};

struct PropertyCore<T> {
    value: Mutex<T>,
    /// Serializes updates so the stored value and the order of change
    /// events agree. Reentrant so observers may update from a callback.
    update_lock: ReentrantMutex<()>,
    changes: Signal<T, NoError>,
    sink: Observer<T, NoError>,
    /// Feeds derived properties; disposed when the property goes away.
    source: Disposable,
    constant: bool,
}

impl<T> PropertyCore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(initial: T, constant: bool) -> Arc<Self> {
        let (changes, sink) = Signal::pipe();
        Arc::new(Self {
            value: Mutex::new(initial),
            update_lock: ReentrantMutex::new(()),
            changes,
            sink,
            source: Disposable::new(),
            constant,
        })
    }

    fn value(&self) -> T {
        self.value.lock().clone()
    }

    fn set(&self, value: T) {
        let _serial = self.update_lock.lock();
        *self.value.lock() = value.clone();
        self.sink.send_next(value);
    }

    fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _serial = self.update_lock.lock();
        let (result, value) = {
            let mut guard = self.value.lock();
            let result = f(&mut guard);
            (result, guard.clone())
        };
        self.sink.send_next(value);
        result
    }

    /// Observer that writes into the property behind `core` while it lives.
    fn writer(core: &Arc<Self>) -> Observer<T, NoError> {
        let core: Weak<Self> = Arc::downgrade(core);
        Observer::with_next(move |value| {
            if let Some(core) = core.upgrade() {
                core.set(value);
            }
        })
    }

    fn producer(core: &Arc<Self>) -> SignalProducer<T, NoError> {
        if core.constant {
            return SignalProducer::value(core.value());
        }
        let core: Weak<Self> = Arc::downgrade(core);
        SignalProducer::new(move |observer, disposable| {
            let Some(core) = core.upgrade() else {
                observer.send_completed();
                return;
            };
            let _serial = core.update_lock.lock();
            observer.send_next(core.value());
            disposable.add(core.changes.observe(observer));
        })
    }
}

impl<T> Drop for PropertyCore<T> {
    fn drop(&mut self) {
        self.source.dispose();
        self.sink.send_completed();
    }
}

/// A read-only property.
///
/// Holds a current value and exposes its changes as a signal. Created from
/// a constant, from a producer or signal that feeds it, or as a read-only
/// view of a [`MutableProperty`].
///
/// # Examples
///
/// ```rust,no_run
/// use reactive_signals::prelude::*;
///
/// let property = Property::from_producer(
///     "initial-value".to_string(),
///     SignalProducer::value("new-value".to_string()),
/// );
/// assert_eq!(property.value(), "new-value");
/// ```
pub struct Property<T> {
    core: Arc<PropertyCore<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Property<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A property whose value never changes.
    pub fn constant(value: T) -> Self {
        Self {
            core: PropertyCore::new(value, true),
        }
    }

    /// A property that starts at `initial` and follows the values of
    /// `producer`, started immediately.
    pub fn from_producer(initial: T, producer: SignalProducer<T, NoError>) -> Self {
        let core = PropertyCore::new(initial, false);
        let start = producer.start(PropertyCore::writer(&core));
        core.source.add(start);
        Self { core }
    }

    /// A property that starts at `initial` and follows the values of `signal`.
    pub fn from_signal(initial: T, signal: &Signal<T, NoError>) -> Self {
        let core = PropertyCore::new(initial, false);
        let subscription = signal.observe(PropertyCore::writer(&core));
        core.source.add(subscription);
        Self { core }
    }

    /// The current value.
    pub fn value(&self) -> T {
        self.core.value()
    }

    /// Changes after this call, completed when the property is dropped.
    pub fn signal(&self) -> Signal<T, NoError> {
        self.core.changes.clone()
    }

    /// The current value followed by every change.
    pub fn producer(&self) -> SignalProducer<T, NoError> {
        PropertyCore::producer(&self.core)
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &*self.core.value.lock())
            .finish()
    }
}

/// A property that can be written.
///
/// Every write is forwarded to the change signal. Once the last handle is
/// dropped the change signal completes.
pub struct MutableProperty<T> {
    core: Arc<PropertyCore<T>>,
}

impl<T> Clone for MutableProperty<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> MutableProperty<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A property holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            core: PropertyCore::new(initial, false),
        }
    }

    /// The current value.
    pub fn value(&self) -> T {
        self.core.value()
    }

    /// Replace the value and notify observers.
    pub fn set(&self, value: T) {
        self.core.set(value);
    }

    /// Update the value in place and notify observers.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.core.modify(f)
    }

    /// Changes after this call.
    pub fn signal(&self) -> Signal<T, NoError> {
        self.core.changes.clone()
    }

    /// The current value followed by every change.
    pub fn producer(&self) -> SignalProducer<T, NoError> {
        PropertyCore::producer(&self.core)
    }

    /// A read-only view sharing this property's value.
    pub fn read_only(&self) -> Property<T> {
        Property {
            core: Arc::clone(&self.core),
        }
    }
}

impl MutableProperty<bool> {
    /// Flip a boolean property.
    pub fn toggle(&self) {
        self.modify(|v| *v = !*v);
    }
}

impl<T: Default + Clone + Send + Sync + 'static> Default for MutableProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for MutableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableProperty")
            .field("value", &*self.core.value.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::tests::record;
    use crate::Event;

    #[test]
    fn test_mutable_property_set_and_modify() {
        let property = MutableProperty::new(5);
        property.set(10);
        assert_eq!(property.value(), 10);

        let doubled = property.modify(|v| {
            *v *= 2;
            *v
        });
        assert_eq!(doubled, 20);
        assert_eq!(property.value(), 20);
    }

    #[test]
    fn test_signal_sees_changes_only() {
        let property = MutableProperty::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        property.signal().observe_next(move |v| seen_clone.lock().push(v));

        property.set(1);
        property.set(2);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_producer_starts_with_current_value() {
        let property = MutableProperty::new("a");
        let (events, _) = record(&property.producer());
        property.set("b");

        assert_eq!(*events.lock(), vec![Event::Next("a"), Event::Next("b")]);
    }

    #[test]
    fn test_dropping_property_completes_observers() {
        let property = MutableProperty::new(1);
        let (events, _) = record(&property.producer());
        let read_only = property.read_only();

        drop(property);
        assert!(events.lock().last() != Some(&Event::Completed));

        drop(read_only);
        assert_eq!(*events.lock(), vec![Event::Next(1), Event::Completed]);
    }

    #[test]
    fn test_producer_of_dropped_property_completes() {
        let property = MutableProperty::new(1);
        let producer = property.producer();
        drop(property);

        let (events, _) = record(&producer);
        assert_eq!(*events.lock(), vec![Event::Completed]);
    }

    #[test]
    fn test_observer_may_read_property_while_notified() {
        let property = MutableProperty::new(0);
        let reader = property.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        property
            .signal()
            .observe_next(move |_| seen_clone.lock().push(reader.value()));

        property.set(4);
        assert_eq!(*seen.lock(), vec![4]);
    }

    #[test]
    fn test_toggle() {
        let property = MutableProperty::new(false);
        property.toggle();
        assert!(property.value());
        property.toggle();
        assert!(!property.value());
    }

    #[test]
    fn test_constant_property() {
        let property = Property::constant("value");
        assert_eq!(property.value(), "value");
        let (events, _) = record(&property.producer());
        assert_eq!(*events.lock(), vec![Event::Next("value"), Event::Completed]);
    }

    #[test]
    fn test_property_from_producer() {
        let property = Property::from_producer(
            "initial-value".to_string(),
            SignalProducer::value("new-value".to_string()),
        );
        assert_eq!(property.value(), "new-value");
    }

    #[test]
    fn test_property_from_signal() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let property = Property::from_signal(0, &signal);
        assert_eq!(property.value(), 0);

        observer.send_next(3);
        assert_eq!(property.value(), 3);
    }

    #[test]
    fn test_dropping_derived_property_detaches_from_source() {
        let (signal, observer) = Signal::<i32, NoError>::pipe();
        let property = Property::from_signal(0, &signal);
        assert_eq!(signal.observer_count(), 1);

        drop(property);
        assert_eq!(signal.observer_count(), 0);
        observer.send_next(1);
    }
}
