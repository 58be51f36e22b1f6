//! Event sinks.
//!
//! Everything the emitter hands a finished [`CdEvent`](crate::core::CdEvent)
//! to lives here: in-process sinks for logging and tests, the HTTP sink, and
//! the bounded queue that keeps slow sinks off host threads.

mod backpressure;
#[cfg(feature = "http")]
mod http;
mod sink;

pub use backpressure::{BackpressureAwareEventSink, BackpressureMetrics};
#[cfg(feature = "http")]
pub use http::{HttpEventSink, STRUCTURED_CONTENT_TYPE};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

#[cfg(test)]
pub use sink::MockEventSink;
