//! Sinks with scripted failures.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::CdEvent;
use crate::errors::SinkError;
use crate::events::EventSink;

/// A sink that refuses every event with the same error.
#[derive(Debug)]
pub struct FailingEventSink {
    error: SinkError,
    calls: AtomicUsize,
}

impl FailingEventSink {
    /// Creates a sink failing with `error`.
    #[must_use]
    pub fn new(error: SinkError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of events offered to the sink.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventSink for FailingEventSink {
    fn publish(&self, _event: &CdEvent) -> Result<(), SinkError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(self.error.clone())
    }
}
