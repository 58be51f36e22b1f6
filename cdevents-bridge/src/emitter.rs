//! Wraps normalized payloads into CDEvents and hands them to a sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{CdEvent, EntityKind, NormalizedEventPayload, TransitionKind};
use crate::errors::BridgeError;
use crate::events::EventSink;
use crate::utils::{Clock, IdGenerator, SystemClock, UuidGenerator};

/// Counters describing best-effort delivery.
#[derive(Debug, Default)]
pub struct EmissionStats {
    emitted: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl EmissionStats {
    /// Records an event the sink accepted.
    pub fn record_emit(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event the sink refused.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a transition that produced no event at all.
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Events the sink accepted.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Events the sink refused.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Transitions dropped before reaching the sink.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Converts the counters to a JSON object.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "emitted": self.emitted(),
            "failed": self.failed(),
            "skipped": self.skipped(),
        })
    }
}

/// Builds [`CdEvent`]s and publishes them.
///
/// Holds no per-call state, so one emitter can serve every host thread.
pub struct Emitter {
    source: String,
    sink: Arc<dyn EventSink>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    stats: EmissionStats,
}

impl Emitter {
    /// Creates an emitter with random UUID ids and the system clock.
    #[must_use]
    pub fn new(source: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            source: source.into(),
            sink,
            ids: Arc::new(UuidGenerator),
            clock: Arc::new(SystemClock),
            stats: EmissionStats::default(),
        }
    }

    /// Replaces the id generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The CloudEvents source stamped on every event.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Delivery counters.
    #[must_use]
    pub fn stats(&self) -> &EmissionStats {
        &self.stats
    }

    /// Builds the event for one transition without publishing it.
    ///
    /// The event time is the payload's occurrence time for the transition
    /// when the host supplied one, else the clock's current time.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedEventType`] for pairs outside the
    /// CDEvents vocabulary.
    pub fn build(
        &self,
        payload: &NormalizedEventPayload,
        transition: TransitionKind,
        entity: EntityKind,
    ) -> Result<CdEvent, BridgeError> {
        let time = payload
            .occurred_at(transition)
            .unwrap_or_else(|| self.clock.now());
        CdEvent::from_payload(self.ids.next_id(), &self.source, time, entity, transition, payload)
    }

    /// Builds the event and publishes it.
    ///
    /// Sink failures are logged once and counted, never returned.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedEventType`] when no event could be
    /// built; in that case the sink is not called.
    pub fn emit(
        &self,
        payload: &NormalizedEventPayload,
        transition: TransitionKind,
        entity: EntityKind,
    ) -> Result<(), BridgeError> {
        let event = self.build(payload, transition, entity)?;

        match self.sink.publish(&event) {
            Ok(()) => {
                self.stats.record_emit();
                debug!(
                    event_type = %event.event_type(),
                    event_id = %event.id(),
                    entity_id = %payload.entity_id,
                    "CDEvent published"
                );
            }
            Err(err) => {
                self.stats.record_failure();
                warn!(
                    event_type = %event.event_type(),
                    event_id = %event.id(),
                    entity_id = %payload.entity_id,
                    error = %err,
                    "Failed to publish CDEvent; dropping it"
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("source", &self.source)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
