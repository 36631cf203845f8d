//! Resume command.

use std::io::Write;

use anyhow::Result;
use att_core::Identity;
use att_core::accounting::format_minutes;
use chrono::{DateTime, Utc};

use crate::cli::SessionArg;
use crate::commands::util::{Engine, target_session};

pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    target: &SessionArg,
    now: DateTime<Utc>,
) -> Result<()> {
    let session_id = target_session(engine, identity, target)?;
    let session = engine.resume(&session_id, now).await?;
    writeln!(
        writer,
        "Resumed. Paused {} in total, worked {}.",
        format_minutes(session.paused_duration_minutes),
        format_minutes(session.elapsed_minutes(now))
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use att_core::special_case::BreakType;
    use att_core::{SessionState, WorkMode};
    use att_engine::{CheckInParams, PauseRequest};
    use insta::assert_snapshot;

    use crate::commands::util::test_support::{engine_at, identity, monday_at};

    #[tokio::test]
    async fn resume_reports_accumulated_pause() {
        let engine = engine_at(None);
        let params = CheckInParams {
            work_mode: Some(WorkMode::Remote),
            ..CheckInParams::default()
        };
        let session = engine
            .check_in(&identity(), params, monday_at(8, 0))
            .await
            .unwrap();
        let pause = PauseRequest {
            reason: String::new(),
            break_type: BreakType::Meal,
            duration_minutes: None,
        };
        engine
            .pause(&session.id, pause, monday_at(10, 0))
            .await
            .unwrap();

        let mut output = Vec::new();
        let target = SessionArg {
            session: Some(session.id.clone()),
        };
        run(&mut output, &engine, &identity(), &target, monday_at(10, 45))
            .await
            .unwrap();

        assert_eq!(engine.session(&session.id).unwrap().state, SessionState::Active);
        assert_snapshot!(String::from_utf8(output).unwrap(), @"Resumed. Paused 0h 45m in total, worked 2h 00m.");
    }
}
