//! Inbound callbacks from the host execution engine.
//!
//! The host registers a [`CdEventsListener`] through whatever extension
//! mechanism it has and forwards its run and graph callbacks to the three
//! [`ExecutionListener`] methods. No callback ever fails or panics on bad
//! input: problems are logged and the host carries on.

use tracing::{trace, warn};

use crate::core::{
    step_transition, EntityKind, ExecutionHandle, GraphNode, TransitionKind,
};
use crate::emitter::Emitter;
use crate::errors::BridgeError;
use crate::translator::Translator;

/// Callbacks the host invokes as executions progress.
pub trait ExecutionListener: Send + Sync {
    /// A job run started.
    fn on_execution_started(&self, handle: &dyn ExecutionHandle);

    /// A job run completed, with its result available on the handle.
    fn on_execution_finished(&self, handle: &dyn ExecutionHandle);

    /// A node was added to a run's execution graph.
    fn on_graph_node_added(&self, node: &GraphNode<'_>);
}

/// Listener that turns host callbacks into CDEvents.
#[derive(Debug)]
pub struct CdEventsListener {
    translator: Translator,
    emitter: Emitter,
}

impl CdEventsListener {
    /// Creates a listener publishing through `emitter`.
    #[must_use]
    pub fn new(emitter: Emitter) -> Self {
        Self {
            translator: Translator::new(),
            emitter,
        }
    }

    /// The emitter, for its delivery counters.
    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    fn capture(
        &self,
        handle: &dyn ExecutionHandle,
        transition: TransitionKind,
        entity: EntityKind,
    ) -> Result<(), BridgeError> {
        let payload = self.translator.translate(handle, transition)?;
        self.emitter.emit(&payload, transition, entity)
    }

    fn handle_event(&self, handle: &dyn ExecutionHandle, transition: TransitionKind, entity: EntityKind) {
        if let Err(err) = self.capture(handle, transition, entity) {
            self.emitter.stats().record_skip();
            warn!(
                entity = %entity,
                transition = %transition,
                entity_id = handle.id().unwrap_or("<unknown>"),
                error = %err,
                "Error while capturing event"
            );
        }
    }
}

impl ExecutionListener for CdEventsListener {
    fn on_execution_started(&self, handle: &dyn ExecutionHandle) {
        self.handle_event(handle, TransitionKind::Started, EntityKind::PipelineRun);
    }

    fn on_execution_finished(&self, handle: &dyn ExecutionHandle) {
        self.handle_event(handle, TransitionKind::Finished, EntityKind::PipelineRun);
    }

    fn on_graph_node_added(&self, node: &GraphNode<'_>) {
        match step_transition(node) {
            Some(transition) => self.handle_event(node.step(), transition, EntityKind::TaskRun),
            None => trace!(kind = %node.kind(), "Ignoring non-step graph node"),
        }
    }
}
