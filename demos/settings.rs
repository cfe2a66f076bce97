//! Settings Example
//!
//! Demonstrates observing settings keys and driving writes through an action.

use reactive_signals::prelude::*;
use reactive_signals::{MemorySettings, ReactiveSettings, SettingsStore};
use std::sync::Arc;

fn main() {
    let store = Arc::new(MemorySettings::<String>::new());

    store.observe("theme").observe_next(|(key, value)| match value {
        Some(value) => println!("{key} = {value}"),
        None => println!("{key} removed"),
    });

    let theme = Property::from_signal(
        "light".to_string(),
        &store
            .observe("theme")
            .map(|(_, value)| value.unwrap_or_else(|| "light".to_string())),
    );

    let writer = Arc::clone(&store);
    let save = Action::new(move |value: String| writer.set_producer("theme", value));
    save.is_executing()
        .signal()
        .observe_next(|executing| println!("saving: {executing}"));

    save.apply("dark".to_string()).start_with(|_| {});
    println!("theme property: {}", theme.value());

    ReactiveSettings::<String>::remove_producer(&store, "theme").start_with(|_| {});
    println!("theme property: {}", theme.value());

    ReactiveSettings::<String>::synchronize_producer(&store)
        .start_with_failed(|error| eprintln!("could not persist settings: {error}"));
}
