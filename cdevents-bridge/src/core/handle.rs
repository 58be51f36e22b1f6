//! Host-side execution handles.
//!
//! The host owns its run and step objects; the bridge only reads them through
//! [`ExecutionHandle`]. [`ExecutionSnapshot`] is a plain owned implementation
//! for hosts that copy their data out before calling in, and for tests.

use serde::{Deserialize, Serialize};

use super::status::HostResult;
use crate::utils::{from_unix_millis, Timestamp};

/// Read-only view of a host run or step.
///
/// Only the display name and id are required by the translator. Everything
/// else is best-effort and defaults to absent.
pub trait ExecutionHandle: Send + Sync {
    /// Display name (the job's full name for runs, the step name for steps).
    fn display_name(&self) -> Option<&str>;

    /// Identifier, unique within the host.
    fn id(&self) -> Option<&str>;

    /// URL of the run or step in the host UI.
    fn url(&self) -> Option<&str> {
        None
    }

    /// When the execution started.
    fn started_at(&self) -> Option<Timestamp> {
        None
    }

    /// When the execution finished.
    fn finished_at(&self) -> Option<Timestamp> {
        None
    }

    /// Result reported by the host, if it has one.
    fn result(&self) -> Option<HostResult> {
        None
    }

    /// Error message attached to the execution, if it failed.
    fn error_message(&self) -> Option<&str> {
        None
    }

    /// The run this execution belongs to; `None` for top-level runs.
    fn parent(&self) -> Option<&RunRef> {
        None
    }
}

/// Reference from a step to the run that contains it.
///
/// The run name stands in for the task name when the step node has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRef {
    /// The run id.
    pub id: String,
    /// The run's display name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RunRef {
    /// Creates a run reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Sets the run's display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Owned copy of an execution's observable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSnapshot {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// End time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// Host result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<HostResult>,
    /// Error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Containing run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RunRef>,
}

impl ExecutionSnapshot {
    /// Creates a snapshot with the two required identity fields.
    #[must_use]
    pub fn new(display_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the start time.
    #[must_use]
    pub fn with_started_at(mut self, at: Timestamp) -> Self {
        self.started_at = Some(at);
        self
    }

    /// Sets the start time from host epoch milliseconds.
    ///
    /// Out-of-range values leave the start time unset.
    #[must_use]
    pub fn with_started_millis(mut self, millis: i64) -> Self {
        self.started_at = from_unix_millis(millis);
        self
    }

    /// Sets the end time.
    #[must_use]
    pub fn with_finished_at(mut self, at: Timestamp) -> Self {
        self.finished_at = Some(at);
        self
    }

    /// Sets the host result.
    #[must_use]
    pub fn with_result(mut self, result: HostResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Sets the error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the containing run.
    #[must_use]
    pub fn with_parent(mut self, parent: RunRef) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl ExecutionHandle for ExecutionSnapshot {
    fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    fn result(&self) -> Option<HostResult> {
        self.result
    }

    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn parent(&self) -> Option<&RunRef> {
        self.parent.as_ref()
    }
}
