//! Core domain model types for the bridge.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Outcome, transition and entity enums
//! - Execution handles and graph nodes supplied by the host
//! - The normalized payload and the CDEvents envelope

mod event;
mod handle;
mod node;
mod payload;
mod status;

pub use event::{
    event_type, CdEvent, CdEventData, EventContext, PipelineRunContent, PipelineRunRef, Subject,
    SubjectContent, TaskRunContent, CDEVENTS_SPEC_VERSION, CLOUDEVENTS_SPEC_VERSION,
    DATA_CONTENT_TYPE,
};
pub use handle::{ExecutionHandle, ExecutionSnapshot, RunRef};
pub use node::{step_transition, GraphNode, NodeKind};
pub use payload::NormalizedEventPayload;
pub use status::{EntityKind, HostResult, Outcome, TransitionKind};
