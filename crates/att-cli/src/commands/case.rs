//! Special case reporting.

use std::io::Write;

use anyhow::Result;
use att_core::{Identity, SpecialCase};
use chrono::{DateTime, Utc};

use crate::cli::SessionArg;
use crate::commands::util::{Engine, target_session, write_session};

pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    target: &SessionArg,
    case: SpecialCase,
    now: DateTime<Utc>,
) -> Result<()> {
    let session_id = target_session(engine, identity, target)?;
    let case_type = case.case_type();
    let session = engine.report_special_case(&session_id, case, now).await?;

    writeln!(writer, "Recorded {case_type}; session is {}.", session.state)?;
    write_session(writer, &session, engine.config().timezone, now)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use att_core::special_case::{EmergencyKind, LowAttendanceAction};
    use att_core::{SessionState, ValidationError, WorkMode};
    use att_engine::{CheckInParams, EngineError};
    use insta::assert_snapshot;

    use crate::commands::util::test_support::{center, engine_at, identity, monday_at, redact};

    fn open_target() -> SessionArg {
        SessionArg { session: None }
    }

    #[tokio::test]
    async fn fire_closes_the_session() {
        let engine = engine_at(Some(center()));
        let session = engine
            .check_in(&identity(), CheckInParams::default(), monday_at(8, 0))
            .await
            .unwrap();

        let mut output = Vec::new();
        let fire = SpecialCase::Emergency {
            kind: EmergencyKind::Fire,
            reason: "alarm in block B".into(),
        };
        run(&mut output, &engine, &identity(), &open_target(), fire, monday_at(9, 10))
            .await
            .unwrap();

        let stored = engine.session(&session.id).unwrap();
        assert_eq!(stored.state, SessionState::Closed);
        assert!(engine.monitor_status(&session.id).is_none());
        assert_snapshot!(redact(output, &session.id), @r"
        Recorded emergency; session is closed.
        Session [ID] (closed)
          Type:        other (onsite)
          Location:    campus
          Checked in:  2025-03-10 08:00
          Checked out: 2025-03-10 09:10 (manual)
          Worked:      1h 10m
          Events:
            09:10 emergency (fire): alarm in block B
          Notes:       Emergency (fire): session closed
        ");
    }

    #[tokio::test]
    async fn low_attendance_records_counts() {
        let engine = engine_at(None);
        let params = CheckInParams {
            work_mode: Some(WorkMode::Remote),
            expected_student_count: Some(30),
            ..CheckInParams::default()
        };
        let session = engine
            .check_in(&identity(), params, monday_at(8, 0))
            .await
            .unwrap();

        let case = SpecialCase::LowAttendance {
            actual_count: 6,
            expected_count: 30,
            action: LowAttendanceAction::Continue,
            reason: String::new(),
        };
        run(&mut Vec::new(), &engine, &identity(), &open_target(), case, monday_at(8, 20))
            .await
            .unwrap();

        let stored = engine.session(&session.id).unwrap();
        assert_eq!(stored.state, SessionState::Active);
        assert_eq!(stored.actual_student_count, Some(6));
        assert_eq!(stored.special_case_log.len(), 1);
    }

    #[tokio::test]
    async fn invalid_meal_break_is_rejected_and_not_logged() {
        let engine = engine_at(None);
        let params = CheckInParams {
            work_mode: Some(WorkMode::Remote),
            ..CheckInParams::default()
        };
        let session = engine
            .check_in(&identity(), params, monday_at(8, 0))
            .await
            .unwrap();

        let case = SpecialCase::MealBreak {
            duration_minutes: 240,
            reason: String::new(),
        };
        let err = run(&mut Vec::new(), &engine, &identity(), &open_target(), case, monday_at(12, 0))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Validation(ValidationError::InvalidMealBreak { .. }))
        ));
        assert!(engine.session(&session.id).unwrap().special_case_log.is_empty());
    }
}
