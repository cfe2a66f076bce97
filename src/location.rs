//! Adapter turning location callbacks into signals.
//!
//! Platform location services report through a delegate with one callback
//! per kind of update. [`LocationFeed`] is what such a delegate forwards to:
//! it owns one pipe per callback and exposes each as a plain signal or
//! producer, so nothing downstream depends on how the platform registers
//! its callbacks.

use crate::config::PipeConfig;
use crate::error::LocationError;
use crate::{NoError, Observer, Signal, SignalProducer};
use std::fmt;

/// A single position fix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    /// Degrees north of the equator.
    pub latitude: f64,
    /// Degrees east of the prime meridian.
    pub longitude: f64,
    /// Radius of uncertainty, in meters.
    pub horizontal_accuracy: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy: 0.0,
        }
    }
}

/// Owns the signals fed by a location delegate.
///
/// Dropping the feed completes both signals.
pub struct LocationFeed {
    updates: Signal<Location, NoError>,
    updates_sink: Observer<Location, NoError>,
    errors: Signal<LocationError, NoError>,
    errors_sink: Observer<LocationError, NoError>,
}

impl LocationFeed {
    pub fn new() -> Self {
        let (updates, updates_sink) = Signal::pipe_with(PipeConfig::default().labeled("location.updates"));
        let (errors, errors_sink) = Signal::pipe_with(PipeConfig::default().labeled("location.errors"));
        Self {
            updates,
            updates_sink,
            errors,
            errors_sink,
        }
    }

    /// Location fixes, most recent fix of each batch only.
    pub fn updates(&self) -> Signal<Location, NoError> {
        self.updates.clone()
    }

    /// Location fixes from the moment the producer is started.
    pub fn updates_producer(&self) -> SignalProducer<Location, NoError> {
        SignalProducer::from_signal(self.updates.clone())
    }

    /// Failures reported by the location source.
    pub fn errors(&self) -> Signal<LocationError, NoError> {
        self.errors.clone()
    }

    /// Delegate callback: a batch of new fixes, oldest first.
    pub fn did_update_locations(&self, locations: &[Location]) {
        let Some(location) = locations.last() else {
            return;
        };
        self.updates_sink.send_next(*location);
    }

    /// Delegate callback: the source failed.
    pub fn did_fail(&self, error: LocationError) {
        tracing::debug!(%error, "location source failed");
        self.errors_sink.send_next(error);
    }
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LocationFeed {
    fn drop(&mut self) {
        self.updates_sink.send_completed();
        self.errors_sink.send_completed();
    }
}

impl fmt::Debug for LocationFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationFeed")
            .field("observers", &self.updates.observer_count())
            .finish()
    }
}
