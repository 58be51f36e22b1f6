//! CDEvents envelope types.
//!
//! A [`CdEvent`] is a CloudEvents 1.0 envelope whose `data` is a CDEvents
//! 0.1.0 document (context + subject). The envelope carries exactly the
//! attributes listed in [`CdEvent::ATTRIBUTE_NAMES`].

use serde::{Deserialize, Serialize};

use super::payload::NormalizedEventPayload;
use super::status::{EntityKind, Outcome, TransitionKind};
use crate::errors::BridgeError;
use crate::utils::Timestamp;

/// CloudEvents specification version of the envelope.
pub const CLOUDEVENTS_SPEC_VERSION: &str = "1.0";

/// CDEvents specification version of the data document.
pub const CDEVENTS_SPEC_VERSION: &str = "0.1.0";

/// Content type of the envelope's `data`.
pub const DATA_CONTENT_TYPE: &str = "application/json";

/// Closed table of supported (entity, transition) pairs.
const EVENT_TYPES: &[(EntityKind, TransitionKind, &str)] = &[
    (
        EntityKind::PipelineRun,
        TransitionKind::Queued,
        "dev.cdevents.pipelinerun.queued.0.1.0",
    ),
    (
        EntityKind::PipelineRun,
        TransitionKind::Started,
        "dev.cdevents.pipelinerun.started.0.1.0",
    ),
    (
        EntityKind::PipelineRun,
        TransitionKind::Finished,
        "dev.cdevents.pipelinerun.finished.0.1.0",
    ),
    (
        EntityKind::TaskRun,
        TransitionKind::Started,
        "dev.cdevents.taskrun.started.0.1.0",
    ),
    (
        EntityKind::TaskRun,
        TransitionKind::Finished,
        "dev.cdevents.taskrun.finished.0.1.0",
    ),
];

/// Looks up the CDEvents `type` string for an entity/transition pair.
///
/// # Errors
///
/// Returns [`BridgeError::UnsupportedEventType`] for pairs the CDEvents
/// vocabulary does not define (e.g. a queued task run).
pub fn event_type(entity: EntityKind, transition: TransitionKind) -> Result<&'static str, BridgeError> {
    EVENT_TYPES
        .iter()
        .find(|(e, t, _)| *e == entity && *t == transition)
        .map(|(_, _, ty)| *ty)
        .ok_or(BridgeError::UnsupportedEventType { entity, transition })
}

/// A CloudEvents envelope carrying a CDEvents document.
///
/// Immutable once built: fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdEvent {
    specversion: String,
    id: String,
    source: String,
    #[serde(rename = "type")]
    event_type: String,
    time: Timestamp,
    datacontenttype: String,
    data: CdEventData,
}

impl CdEvent {
    /// CloudEvents attributes present on every event.
    pub const ATTRIBUTE_NAMES: [&'static str; 6] =
        ["datacontenttype", "specversion", "id", "source", "time", "type"];

    /// Builds the envelope for one transition of a payload.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnsupportedEventType`] when no CDEvents type
    /// exists for `(entity, transition)`.
    pub fn from_payload(
        id: impl Into<String>,
        source: impl Into<String>,
        time: Timestamp,
        entity: EntityKind,
        transition: TransitionKind,
        payload: &NormalizedEventPayload,
    ) -> Result<Self, BridgeError> {
        let event_type = event_type(entity, transition)?;
        let id = id.into();
        let source = source.into();

        let content = match entity {
            EntityKind::PipelineRun => SubjectContent::PipelineRun(PipelineRunContent {
                pipeline_name: payload.entity_name.clone(),
                url: payload.url.clone(),
                outcome: payload.outcome,
                errors: payload.errors.clone(),
            }),
            EntityKind::TaskRun => SubjectContent::TaskRun(TaskRunContent {
                task_name: payload.entity_name.clone(),
                url: payload.url.clone(),
                pipeline_run: payload.pipeline_run.as_ref().map(|run| PipelineRunRef {
                    id: run.id.clone(),
                    source: source.clone(),
                }),
                outcome: payload.outcome,
                errors: payload.errors.clone(),
            }),
        };

        let data = CdEventData {
            context: EventContext {
                version: CDEVENTS_SPEC_VERSION.to_string(),
                id: id.clone(),
                source: source.clone(),
                event_type: event_type.to_string(),
                timestamp: time,
            },
            subject: Subject {
                id: payload.entity_id.clone(),
                source: source.clone(),
                subject_type: entity.subject_type().to_string(),
                content,
            },
        };

        Ok(Self {
            specversion: CLOUDEVENTS_SPEC_VERSION.to_string(),
            id,
            source,
            event_type: event_type.to_string(),
            time,
            datacontenttype: DATA_CONTENT_TYPE.to_string(),
            data,
        })
    }

    /// CloudEvents spec version.
    #[must_use]
    pub fn specversion(&self) -> &str {
        &self.specversion
    }

    /// Unique event id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Emitting system instance.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// CDEvents type, e.g. `dev.cdevents.pipelinerun.started.0.1.0`.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Event time.
    #[must_use]
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// MIME type of `data`.
    #[must_use]
    pub fn datacontenttype(&self) -> &str {
        &self.datacontenttype
    }

    /// The CDEvents document.
    #[must_use]
    pub fn data(&self) -> &CdEventData {
        &self.data
    }

    /// Serializes `data` alone, as sent in binary-mode HTTP bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn data_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.data)
    }

    /// Serializes the whole envelope, as sent in structured mode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// CDEvents document: context plus subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdEventData {
    /// Event context.
    pub context: EventContext,
    /// Event subject.
    pub subject: Subject,
}

/// CDEvents context block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// CDEvents spec version.
    pub version: String,
    /// Same as the envelope id.
    pub id: String,
    /// Same as the envelope source.
    pub source: String,
    /// Same as the envelope type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Same as the envelope time.
    pub timestamp: Timestamp,
}

/// CDEvents subject block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Id of the run or step.
    pub id: String,
    /// Source of the subject.
    pub source: String,
    /// `pipelineRun` or `taskRun`.
    #[serde(rename = "type")]
    pub subject_type: String,
    /// Entity-specific content.
    pub content: SubjectContent,
}

/// Entity-specific subject content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectContent {
    /// Content of a pipeline run subject.
    PipelineRun(PipelineRunContent),
    /// Content of a task run subject.
    TaskRun(TaskRunContent),
}

impl SubjectContent {
    /// Outcome carried by the content, if any.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::PipelineRun(c) => c.outcome,
            Self::TaskRun(c) => c.outcome,
        }
    }
}

/// Pipeline run subject content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunContent {
    /// Pipeline (job) name.
    pub pipeline_name: String,
    /// Run URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Outcome, finished events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Error details, finished events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

/// Task run subject content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunContent {
    /// Task (step) name.
    pub task_name: String,
    /// Step URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The pipeline run this task belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_run: Option<PipelineRunRef>,
    /// Outcome, finished events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Error details, finished events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
}

/// Reference from a task run to its pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunRef {
    /// Pipeline run id.
    pub id: String,
    /// Pipeline run source.
    pub source: String,
}
