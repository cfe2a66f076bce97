//! Error types used by the higher level building blocks.
//!
//! Stream failures are whatever `E` a producer chooses; the types here cover
//! the failures the crate itself introduces:
//!
//! - [`ActionError`]: an [`Action`](crate::Action) was disabled, or its
//!   producer failed.
//! - [`SettingsError`]: a settings store could not persist its values.
//! - [`LocationError`]: a location source stopped delivering updates.

use thiserror::Error;

/// Failure of an [`Action`](crate::Action) application.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError<E> {
    /// The action was disabled or already executing when applied.
    #[error("action is not enabled")]
    NotEnabled,

    /// The producer built for the input failed.
    #[error("action producer failed: {0}")]
    Producer(E),
}

impl<E> ActionError<E> {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActionError::NotEnabled => "action_not_enabled",
            ActionError::Producer(_) => "action_producer_failed",
        }
    }

    /// The producer's error, if that is what failed.
    pub fn producer_error(&self) -> Option<&E> {
        match self {
            ActionError::Producer(error) => Some(error),
            ActionError::NotEnabled => None,
        }
    }
}

/// Failure of a settings store.
///
/// Every platform cause maps to this single domain error; the cause is kept
/// as text.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Values could not be written to durable storage.
    #[error("settings synchronization failed: {reason}")]
    Synchronization {
        /// Description of the underlying cause.
        reason: String,
    },
}

/// Failure reported by a location source.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The source cannot determine the current location.
    #[error("location unavailable: {reason}")]
    Unavailable {
        /// Description of the underlying cause.
        reason: String,
    },
}
