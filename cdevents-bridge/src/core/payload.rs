//! Normalized intermediate model between host handles and CDEvents.

use serde::{Deserialize, Serialize};

use super::handle::RunRef;
use super::status::{Outcome, TransitionKind};
use crate::utils::Timestamp;

/// Host-independent description of one execution transition.
///
/// `outcome` and `errors` are only ever set for finished transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEventPayload {
    /// Name of the pipeline or task.
    pub entity_name: String,

    /// Identifier of the run or step.
    pub entity_id: String,

    /// Link back to the host UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Outcome, present only on finished events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    /// When the execution started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_started: Option<Timestamp>,

    /// When the execution finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_finished: Option<Timestamp>,

    /// Error details, present only on finished events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,

    /// The run a task belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_run: Option<RunRef>,
}

impl NormalizedEventPayload {
    /// Creates a payload with only the identity fields set.
    #[must_use]
    pub fn new(entity_name: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_id: entity_id.into(),
            url: None,
            outcome: None,
            timestamp_started: None,
            timestamp_finished: None,
            errors: None,
            pipeline_run: None,
        }
    }

    /// The time the given transition actually happened, when the host told us.
    #[must_use]
    pub fn occurred_at(&self, transition: TransitionKind) -> Option<Timestamp> {
        match transition {
            TransitionKind::Queued => None,
            TransitionKind::Started => self.timestamp_started,
            TransitionKind::Finished => self.timestamp_finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_started_payload_omits_outcome() {
        let payload = NormalizedEventPayload::new("TestJob1", "1");
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["entityName"], "TestJob1");
        assert_eq!(json["entityId"], "1");
        assert!(json.get("outcome").is_none());
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_occurred_at() {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let finished = Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 0).unwrap();
        let mut payload = NormalizedEventPayload::new("job", "1");
        payload.timestamp_started = Some(started);
        payload.timestamp_finished = Some(finished);

        assert_eq!(payload.occurred_at(TransitionKind::Started), Some(started));
        assert_eq!(payload.occurred_at(TransitionKind::Finished), Some(finished));
        assert_eq!(payload.occurred_at(TransitionKind::Queued), None);
    }
}
