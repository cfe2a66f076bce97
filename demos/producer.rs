//! Producer Example
//!
//! Demonstrates buffered producers, operators and a concatenating flat_map.

use reactive_signals::prelude::*;

fn main() {
    let (numbers, numbers_observer) = SignalProducer::<i32, NoError>::buffer(4);
    let (letters, letters_observer) = SignalProducer::<String, NoError>::buffer(4);

    let disposable = numbers
        .flat_map(FlattenStrategy::Concat, move |number| {
            letters.map(move |letter| format!("{number}-{letter}"))
        })
        .start_with(|event| match event {
            Event::Next(value) => println!("{value}"),
            other => println!("finished: {other}"),
        });

    for letter in ["A", "B", "C"] {
        letters_observer.send_next(letter.to_string());
    }
    letters_observer.send_completed();

    numbers_observer.send_next(1);
    numbers_observer.send_next(2);
    numbers_observer.send_completed();

    // Already terminated, so this is a no-op.
    disposable.dispose();

    let names = SignalProducer::<Option<String>, NoError>::from_values([
        Some("Alice".to_string()),
        None,
        Some("Bob".to_string()),
    ]);
    names
        .ignore_nil()
        .map(|name| name.to_uppercase())
        .start_with_next(|name| println!("hello {name}"));
}
