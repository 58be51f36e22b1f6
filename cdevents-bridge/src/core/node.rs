//! Execution-graph nodes and the step-boundary filter.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::handle::ExecutionHandle;
use super::status::TransitionKind;

/// Kind of a node added to the host's execution graph.
///
/// Resolved once at the host boundary from whatever node classes the host
/// uses. Only step boundaries produce events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Opens a step block.
    StepStart,
    /// Closes a step block.
    StepEnd,
    /// Anything else (atom steps, flow start/end, parallel branches).
    Other,
}

impl NodeKind {
    /// The task-run transition this node denotes, if any.
    #[must_use]
    pub fn transition(&self) -> Option<TransitionKind> {
        match self {
            Self::StepStart => Some(TransitionKind::Started),
            Self::StepEnd => Some(TransitionKind::Finished),
            Self::Other => None,
        }
    }

    /// Returns true if the node is a step start or step end.
    #[must_use]
    pub fn is_step_boundary(&self) -> bool {
        self.transition().is_some()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepStart => write!(f, "step_start"),
            Self::StepEnd => write!(f, "step_end"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A node newly added to the host's execution graph.
pub struct GraphNode<'a> {
    kind: NodeKind,
    step: &'a dyn ExecutionHandle,
}

impl<'a> GraphNode<'a> {
    /// Creates a node of the given kind over the step it describes.
    #[must_use]
    pub fn new(kind: NodeKind, step: &'a dyn ExecutionHandle) -> Self {
        Self { kind, step }
    }

    /// Creates a step start node.
    #[must_use]
    pub fn step_start(step: &'a dyn ExecutionHandle) -> Self {
        Self::new(NodeKind::StepStart, step)
    }

    /// Creates a step end node.
    #[must_use]
    pub fn step_end(step: &'a dyn ExecutionHandle) -> Self {
        Self::new(NodeKind::StepEnd, step)
    }

    /// Creates a node that is not a step boundary.
    #[must_use]
    pub fn other(step: &'a dyn ExecutionHandle) -> Self {
        Self::new(NodeKind::Other, step)
    }

    /// The node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The step this node belongs to.
    #[must_use]
    pub fn step(&self) -> &'a dyn ExecutionHandle {
        self.step
    }
}

impl fmt::Debug for GraphNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("kind", &self.kind)
            .field("step_id", &self.step.id())
            .finish()
    }
}

/// Decides whether a node denotes a step boundary.
///
/// Returns the task-run transition to emit, or `None` when the node must be
/// ignored.
#[must_use]
pub fn step_transition(node: &GraphNode<'_>) -> Option<TransitionKind> {
    node.kind().transition()
}
