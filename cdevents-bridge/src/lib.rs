//! # cdevents-bridge
//!
//! Translates CI run and step lifecycle callbacks into
//! [CDEvents](https://cdevents.dev), carried as CloudEvents.
//!
//! The host execution engine calls an [`ExecutionListener`](listener::ExecutionListener)
//! when a run starts or finishes and when its execution graph gains a node.
//! The bridge:
//!
//! - **Translates** the host's run or step into a normalized payload
//! - **Builds** a `pipelinerun` or `taskrun` CDEvent around it
//! - **Publishes** the event to a sink (log, HTTP, or a bounded queue)
//!
//! Delivery is best-effort. Nothing that goes wrong in the bridge ever
//! reaches the host: every failure ends in a log line.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use cdevents_bridge::prelude::*;
//!
//! let sink = Arc::new(CollectingEventSink::new());
//! let listener = CdEventsListener::new(Emitter::new("jenkins", sink.clone()));
//!
//! let run = ExecutionSnapshot::new("TestJob1", "1");
//! listener.on_execution_started(&run);
//! listener.on_execution_finished(&run.clone().with_result(HostResult::Success));
//!
//! assert_eq!(sink.len(), 2);
//! assert_eq!(sink.events()[0].event_type(), "dev.cdevents.pipelinerun.started.0.1.0");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod emitter;
pub mod errors;
pub mod events;
pub mod listener;
pub mod observability;
pub mod testing;
pub mod translator;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{BridgeConfig, HttpMode, SinkKind};
    pub use crate::core::{
        CdEvent, EntityKind, ExecutionHandle, ExecutionSnapshot, GraphNode, HostResult,
        NodeKind, NormalizedEventPayload, Outcome, RunRef, TransitionKind,
    };
    pub use crate::emitter::{EmissionStats, Emitter};
    pub use crate::errors::{BridgeError, SinkError};
    #[cfg(feature = "http")]
    pub use crate::events::HttpEventSink;
    pub use crate::events::{
        BackpressureAwareEventSink, CollectingEventSink, EventSink, LoggingEventSink,
        NoOpEventSink,
    };
    pub use crate::listener::{CdEventsListener, ExecutionListener};
    pub use crate::translator::Translator;
    pub use crate::utils::{Clock, IdGenerator, SystemClock, UuidGenerator};
}
