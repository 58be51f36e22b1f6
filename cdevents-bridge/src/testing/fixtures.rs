//! Fixture runs, steps and a wired-up listener.

use std::sync::Arc;

use crate::core::{ExecutionSnapshot, RunRef};
use crate::emitter::Emitter;
use crate::events::{CollectingEventSink, EventSink};
use crate::listener::CdEventsListener;
use crate::utils::{FixedClock, SequentialIdGenerator, Timestamp};

/// The run used throughout the test suite: `TestJob1` #1.
#[must_use]
pub fn sample_run() -> ExecutionSnapshot {
    ExecutionSnapshot::new("TestJob1", "1").with_url("http://localhost/job/1/stage/1")
}

/// A step of [`sample_run`].
#[must_use]
pub fn sample_step(name: &str, id: &str) -> ExecutionSnapshot {
    ExecutionSnapshot::new(name, id)
        .with_url(format!("http://localhost/job/1/execution/node/{id}/"))
        .with_parent(RunRef::new("1").with_name("TestJob1"))
}

/// A listener wired to a collecting sink with predictable ids and time.
pub struct TestHarness {
    /// The sink receiving every event.
    pub sink: Arc<CollectingEventSink>,
    /// The listener under test.
    pub listener: CdEventsListener,
}

impl TestHarness {
    /// Creates a harness whose clock is fixed at `now`.
    #[must_use]
    pub fn new(now: Timestamp) -> Self {
        let sink = Arc::new(CollectingEventSink::new());
        Self {
            listener: Self::listener_for(sink.clone(), now),
            sink,
        }
    }

    /// Builds a listener over any sink with sequential ids and a fixed clock.
    #[must_use]
    pub fn listener_for(sink: Arc<dyn EventSink>, now: Timestamp) -> CdEventsListener {
        let emitter = Emitter::new("test", sink)
            .with_id_generator(Arc::new(SequentialIdGenerator::new("evt")))
            .with_clock(Arc::new(FixedClock(now)));
        CdEventsListener::new(emitter)
    }
}
