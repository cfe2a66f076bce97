//! # Reactive Signals
//!
//! A small, thread-safe reactive streams library built around signals and
//! signal producers.
//!
//! ## Features
//!
//! - **Signals**: hot, multicast streams of [`Event`]s, driven through an
//!   [`Observer`]
//! - **Producers**: restartable descriptions of work; each start gets its own
//!   signal and its own [`Disposable`]
//! - **Operators**: `map`, `map_err`, `filter`, `ignore_nil` and a
//!   concatenating `flat_map`
//! - **Properties and actions**: current values with change signals, and
//!   gated units of work
//! - **Bridges**: per-key settings observation, location callbacks, and
//!   `futures::Stream` consumption
//!
//! ## Example
//!
//! ```rust,no_run
//! use reactive_signals::prelude::*;
//!
//! let (producer, observer) = SignalProducer::<String, NoError>::buffer(2);
//! producer.start_with_next(|value| println!("{value}"));
//! observer.send_next("yai!".to_string());
//! ```

mod action;
mod config;
mod disposable;
mod error;
mod event;
mod location;
mod observer;
mod operators;
mod producer;
mod property;
mod settings;
mod signal;
mod storage;
mod stream;

pub use action::Action;
pub use config::{PipeConfig, Replay};
pub use disposable::{Disposable, ScopedDisposable};
pub use error::{ActionError, LocationError, SettingsError};
pub use event::{Event, NoError};
pub use location::{Location, LocationFeed};
pub use observer::Observer;
pub use operators::FlattenStrategy;
pub use producer::SignalProducer;
pub use property::{MutableProperty, Property};
pub use settings::{Change, KeyedSignals, MemorySettings, ReactiveSettings, SettingsStore};
pub use signal::Signal;
pub use stream::EventStream;

// Re-export the prelude
pub mod prelude {
    pub use crate::{
        Action, Disposable, Event, FlattenStrategy, MutableProperty, NoError, Observer, Property,
        Signal, SignalProducer,
    };
}
