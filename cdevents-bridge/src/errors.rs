//! Error types for the CDEvents bridge.
//!
//! Nothing in this crate lets an error reach the host's execution pipeline:
//! the listener logs every failure and moves on. These types exist so the
//! layers below the listener can say precisely what went wrong.

use thiserror::Error;

use crate::core::{EntityKind, TransitionKind};

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required identity field was absent on the execution handle.
    #[error("missing required field `{field}` on execution handle")]
    MissingData {
        /// Name of the absent field (e.g. `entityName`).
        field: &'static str,
    },

    /// No CDEvents type exists for the entity/transition pair.
    #[error("no CDEvents type for {entity} {transition}")]
    UnsupportedEventType {
        /// The entity kind requested.
        entity: EntityKind,
        /// The transition requested.
        transition: TransitionKind,
    },

    /// A sink failed to accept or deliver an event.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Creates a missing-data error for the named field.
    #[must_use]
    pub fn missing(field: &'static str) -> Self {
        Self::MissingData { field }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Error raised by an [`EventSink`](crate::events::EventSink) when an event
/// cannot be accepted or delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The sink cannot take events right now.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The remote endpoint answered with a non-success status.
    #[error("sink rejected event with HTTP status {status}")]
    Rejected {
        /// The HTTP status code returned.
        status: u16,
    },

    /// The request never completed.
    #[error("sink transport error: {0}")]
    Transport(String),

    /// The event could not be encoded for the wire.
    #[error("failed to encode event: {0}")]
    Encode(String),

    /// The bounded delivery queue is full.
    #[error("sink queue full (capacity {capacity})")]
    QueueFull {
        /// Capacity of the queue that rejected the event.
        capacity: usize,
    },
}

impl SinkError {
    /// Returns true if a later attempt could plausibly succeed.
    ///
    /// The bridge never retries; this is informational for sinks and logs.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Transport(_) | Self::QueueFull { .. } => true,
            Self::Rejected { status } => *status >= 500,
            Self::Encode(_) => false,
        }
    }
}
