//! Maps host execution handles into normalized payloads.

use crate::core::{ExecutionHandle, NormalizedEventPayload, Outcome, TransitionKind};
use crate::errors::BridgeError;

/// Stateless translator from [`ExecutionHandle`] to [`NormalizedEventPayload`].
///
/// Pure: the same handle and transition always give the same payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator;

impl Translator {
    /// Creates a translator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Translates one transition of `handle`.
    ///
    /// Optional host data (URL, times) is copied when present and never
    /// invented. Outcome and error details are only attached to finished
    /// transitions. A step without a display name of its own is named after
    /// its parent run.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MissingData`] when neither the handle nor its
    /// parent has a usable display name, or the handle has no usable id.
    pub fn translate(
        &self,
        handle: &dyn ExecutionHandle,
        transition: TransitionKind,
    ) -> Result<NormalizedEventPayload, BridgeError> {
        let own_name = handle.display_name().filter(|v| !v.trim().is_empty());
        let run_name = handle.parent().and_then(|run| run.name.as_deref());
        let entity_name = required(own_name.or(run_name), "entityName")?;
        let entity_id = required(handle.id(), "entityId")?;

        let mut payload = NormalizedEventPayload::new(entity_name, entity_id);
        payload.url = present(handle.url());
        payload.timestamp_started = handle.started_at();
        payload.pipeline_run = handle.parent().cloned();

        if transition.is_finished() {
            payload.outcome = Some(Outcome::from_host(handle.result()));
            payload.timestamp_finished = handle.finished_at();
            payload.errors = present(handle.error_message());
        }

        Ok(payload)
    }
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, BridgeError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BridgeError::missing(field))
}

fn present(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionSnapshot, HostResult, RunRef};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn run() -> ExecutionSnapshot {
        ExecutionSnapshot::new("TestJob1", "1").with_url("http://localhost/job/1/stage/1")
    }

    #[test]
    fn test_started_has_no_outcome() {
        let handle = run().with_result(HostResult::Success).with_error("boom");
        let payload = Translator.translate(&handle, TransitionKind::Started).unwrap();

        assert_eq!(payload.entity_name, "TestJob1");
        assert_eq!(payload.entity_id, "1");
        assert_eq!(payload.url.as_deref(), Some("http://localhost/job/1/stage/1"));
        assert_eq!(payload.outcome, None);
        assert_eq!(payload.errors, None);

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("outcome").is_none());
    }

    #[test]
    fn test_finished_outcomes_verbatim() {
        for (result, expected) in [
            (HostResult::Success, Outcome::Success),
            (HostResult::Failure, Outcome::Failure),
            (HostResult::Aborted, Outcome::Aborted),
        ] {
            let handle = run().with_result(result);
            let payload = Translator.translate(&handle, TransitionKind::Finished).unwrap();
            assert_eq!(payload.outcome, Some(expected));
        }
    }

    #[test]
    fn test_finished_without_result_is_unknown() {
        let payload = Translator.translate(&run(), TransitionKind::Finished).unwrap();
        assert_eq!(payload.outcome, Some(Outcome::Unknown));
    }

    #[test]
    fn test_finished_carries_errors() {
        let handle = run()
            .with_result(HostResult::Failure)
            .with_error("script returned exit code 2");
        let payload = Translator.translate(&handle, TransitionKind::Finished).unwrap();
        assert_eq!(payload.errors.as_deref(), Some("script returned exit code 2"));
    }

    #[test]
    fn test_missing_name_fails() {
        let handle = ExecutionSnapshot {
            id: Some("1".into()),
            ..Default::default()
        };
        let err = Translator.translate(&handle, TransitionKind::Started).unwrap_err();
        assert!(matches!(err, BridgeError::MissingData { field: "entityName" }));
    }

    #[test]
    fn test_unnamed_step_takes_run_name() {
        let step = ExecutionSnapshot {
            id: Some("5".into()),
            parent: Some(RunRef::new("1").with_name("TestJob1")),
            ..Default::default()
        };
        let payload = Translator.translate(&step, TransitionKind::Started).unwrap();
        assert_eq!(payload.entity_name, "TestJob1");
        assert_eq!(payload.entity_id, "5");

        // A step's own name wins over the run's.
        let named = ExecutionSnapshot {
            display_name: Some("Build".into()),
            ..step
        };
        let payload = Translator.translate(&named, TransitionKind::Finished).unwrap();
        assert_eq!(payload.entity_name, "Build");
    }

    #[test]
    fn test_unnamed_step_with_unnamed_run_fails() {
        let step = ExecutionSnapshot {
            id: Some("5".into()),
            display_name: Some("  ".into()),
            parent: Some(RunRef::new("1")),
            ..Default::default()
        };
        let err = Translator.translate(&step, TransitionKind::Started).unwrap_err();
        assert!(matches!(err, BridgeError::MissingData { field: "entityName" }));
    }

    #[test]
    fn test_blank_id_fails() {
        let handle = ExecutionSnapshot::new("job", "   ");
        let err = Translator.translate(&handle, TransitionKind::Finished).unwrap_err();
        assert!(matches!(err, BridgeError::MissingData { field: "entityId" }));
    }

    #[test]
    fn test_absent_optional_fields_stay_absent() {
        let handle = ExecutionSnapshot::new("job", "1").with_url("");
        let payload = Translator.translate(&handle, TransitionKind::Finished).unwrap();
        assert_eq!(payload.url, None);
        assert_eq!(payload.timestamp_started, None);
        assert_eq!(payload.timestamp_finished, None);
    }

    #[test]
    fn test_timing_and_parent() {
        let started = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let finished = Utc.with_ymd_and_hms(2024, 3, 1, 10, 2, 0).unwrap();
        let handle = ExecutionSnapshot::new("Build", "12")
            .with_started_at(started)
            .with_finished_at(finished)
            .with_parent(RunRef::new("1"));

        let started_payload = Translator.translate(&handle, TransitionKind::Started).unwrap();
        assert_eq!(started_payload.timestamp_started, Some(started));
        assert_eq!(started_payload.timestamp_finished, None);
        assert_eq!(started_payload.pipeline_run, Some(RunRef::new("1")));

        let finished_payload = Translator.translate(&handle, TransitionKind::Finished).unwrap();
        assert_eq!(finished_payload.timestamp_finished, Some(finished));
    }

    #[test]
    fn test_translation_is_idempotent() {
        let handle = run().with_result(HostResult::Success);
        let first = Translator.translate(&handle, TransitionKind::Finished).unwrap();
        let second = Translator.translate(&handle, TransitionKind::Finished).unwrap();
        assert_eq!(first, second);
    }
}
