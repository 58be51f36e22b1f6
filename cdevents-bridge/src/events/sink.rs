//! Event sink trait and in-process implementations.

use async_trait::async_trait;
use tracing::{debug, info, Level};

use crate::core::CdEvent;
use crate::errors::SinkError;

/// Destination for emitted events.
///
/// `publish` is called from host callback threads and must not block on
/// delivery; sinks doing I/O hand the event off and return. `deliver` is the
/// awaitable variant used by queueing sinks and async callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Accepts an event without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the event cannot be accepted.
    fn publish(&self, event: &CdEvent) -> Result<(), SinkError>;

    /// Delivers an event, completing when the destination has it.
    ///
    /// Defaults to [`publish`](Self::publish) for sinks with nothing to await.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if delivery fails.
    async fn deliver(&self, event: &CdEvent) -> Result<(), SinkError> {
        self.publish(event)
    }
}

/// A no-op event sink that discards all events.
///
/// Used when the sink is configured as `none`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    fn publish(&self, _event: &CdEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &CdEvent) -> Result<(), SinkError> {
        let body = serde_json::to_string(event).map_err(|e| SinkError::Encode(e.to_string()))?;
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                cdevent = %body,
                "CDEvent: {}", event.event_type()
            );
        } else {
            info!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                cdevent = %body,
                "CDEvent: {}", event.event_type()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    fn publish(&self, event: &CdEvent) -> Result<(), SinkError> {
        self.log_event(event)
    }
}

/// A collecting event sink for tests and embedding.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<CdEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<CdEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with a prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<CdEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    fn publish(&self, event: &CdEvent) -> Result<(), SinkError> {
        self.events.write().push(event.clone());
        Ok(())
    }
}
