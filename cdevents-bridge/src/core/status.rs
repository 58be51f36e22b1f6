//! Outcome, transition and entity enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result reported by the host for a finished run or step.
///
/// This is the host's own vocabulary; [`Outcome`] is what goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostResult {
    /// Completed without errors.
    Success,
    /// Completed, but with test failures or other soft errors.
    Unstable,
    /// Failed.
    Failure,
    /// Never ran (e.g. an earlier stage failed).
    NotBuilt,
    /// Interrupted by a user or timeout.
    Aborted,
}

impl HostResult {
    /// Maps the host result into the CDEvents outcome vocabulary.
    #[must_use]
    pub fn outcome(self) -> Outcome {
        match self {
            Self::Success => Outcome::Success,
            Self::Unstable | Self::Failure => Outcome::Failure,
            Self::Aborted => Outcome::Aborted,
            Self::NotBuilt => Outcome::Unknown,
        }
    }
}

impl fmt::Display for HostResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Failure => write!(f, "FAILURE"),
            Self::NotBuilt => write!(f, "NOT_BUILT"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Outcome of a finished pipeline or task run, as carried in CDEvents content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// The run succeeded.
    Success,
    /// The run failed.
    Failure,
    /// The run was aborted.
    Aborted,
    /// The host reported no usable result.
    Unknown,
}

impl Outcome {
    /// Maps an optional host result; no result at all is `Unknown`.
    #[must_use]
    pub fn from_host(result: Option<HostResult>) -> Self {
        result.map_or(Self::Unknown, HostResult::outcome)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
            Self::Aborted => write!(f, "ABORTED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A lifecycle transition observed on an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Accepted by the host but not yet running.
    Queued,
    /// Started running.
    Started,
    /// Finished, with an outcome.
    Finished,
}

impl TransitionKind {
    /// Returns true for the terminal transition.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Started => write!(f, "started"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// The CDEvents subject an execution maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// A whole job run.
    PipelineRun,
    /// A single step within a run.
    TaskRun,
}

impl EntityKind {
    /// The `subject.type` value for this entity.
    #[must_use]
    pub fn subject_type(&self) -> &'static str {
        match self {
            Self::PipelineRun => "pipelineRun",
            Self::TaskRun => "taskRun",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PipelineRun => write!(f, "pipelinerun"),
            Self::TaskRun => write!(f, "taskrun"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_result_mapping() {
        assert_eq!(HostResult::Success.outcome(), Outcome::Success);
        assert_eq!(HostResult::Unstable.outcome(), Outcome::Failure);
        assert_eq!(HostResult::Failure.outcome(), Outcome::Failure);
        assert_eq!(HostResult::Aborted.outcome(), Outcome::Aborted);
        assert_eq!(HostResult::NotBuilt.outcome(), Outcome::Unknown);
    }

    #[test]
    fn test_missing_result_is_unknown() {
        assert_eq!(Outcome::from_host(None), Outcome::Unknown);
        assert_eq!(Outcome::from_host(Some(HostResult::Success)), Outcome::Success);
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_string(&Outcome::Aborted).unwrap();
        assert_eq!(json, r#""ABORTED""#);

        let deserialized: Outcome = serde_json::from_str(r#""SUCCESS""#).unwrap();
        assert_eq!(deserialized, Outcome::Success);
    }

    #[test]
    fn test_host_result_deserialize() {
        let result: HostResult = serde_json::from_str(r#""NOT_BUILT""#).unwrap();
        assert_eq!(result, HostResult::NotBuilt);
        assert_eq!(result.to_string(), "NOT_BUILT");
    }

    #[test]
    fn test_display() {
        assert_eq!(TransitionKind::Started.to_string(), "started");
        assert_eq!(TransitionKind::Finished.to_string(), "finished");
        assert_eq!(EntityKind::PipelineRun.to_string(), "pipelinerun");
        assert_eq!(EntityKind::TaskRun.subject_type(), "taskRun");
        assert_eq!(Outcome::Unknown.to_string(), "UNKNOWN");
    }
}
