//! Check-out command.

use std::io::Write;

use anyhow::Result;
use att_core::Identity;
use att_engine::CheckOutRequest;
use chrono::{DateTime, Utc};

use crate::cli::CheckOutArgs;
use crate::commands::util::{Engine, target_session, write_session};

pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    args: &CheckOutArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let session_id = target_session(engine, identity, &args.target)?;
    let session = engine
        .check_out(&session_id, CheckOutRequest::manual(args.notes.clone()), now)
        .await?;

    writeln!(writer, "Checked out.")?;
    write_session(writer, &session, engine.config().timezone, now)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use att_core::special_case::BreakType;
    use att_engine::{CheckInParams, PauseRequest};
    use insta::assert_snapshot;

    use crate::cli::SessionArg;
    use crate::commands::util::test_support::{center, engine_at, identity, monday_at, redact};

    #[tokio::test]
    async fn closes_session_and_stops_monitor() {
        let engine = engine_at(Some(center()));
        let session = engine
            .check_in(&identity(), CheckInParams::default(), monday_at(8, 0))
            .await
            .unwrap();
        assert!(engine.monitor_status(&session.id).is_some());

        let pause = PauseRequest {
            reason: "lunch".into(),
            break_type: BreakType::Meal,
            duration_minutes: Some(30),
        };
        engine
            .pause(&session.id, pause, monday_at(12, 0))
            .await
            .unwrap();
        engine.resume(&session.id, monday_at(12, 30)).await.unwrap();

        let mut output = Vec::new();
        let args = CheckOutArgs {
            target: SessionArg { session: None },
            notes: Some("graded labs".into()),
        };
        run(&mut output, &engine, &identity(), &args, monday_at(16, 0))
            .await
            .unwrap();

        assert!(engine.monitor_status(&session.id).is_none());
        assert!(engine.open_session(&identity().user_id).unwrap().is_none());
        assert_snapshot!(redact(output, &session.id), @r"
        Checked out.
        Session [ID] (closed)
          Type:        other (onsite)
          Location:    campus
          Checked in:  2025-03-10 08:00
          Checked out: 2025-03-10 16:00 (manual)
          Worked:      7h 30m
          Paused:      0h 30m
          Events:
            12:00 break (meal): lunch
          Notes:       graded labs
        ");
    }
}
