//! Check-in command.

use std::io::Write;

use anyhow::Result;
use att_core::{Identity, SessionEntry};
use att_engine::CheckInParams;
use chrono::{DateTime, Utc};

use crate::cli::CheckInArgs;
use crate::commands::util::{Engine, write_json, write_session};

/// Maps the flags onto engine parameters. Unset flags stay open for the
/// schedule to fill.
pub fn params(args: &CheckInArgs) -> CheckInParams {
    CheckInParams {
        entry_type: args.entry_type,
        work_mode: args.mode,
        course_name: args.course.clone(),
        location_id: args.location.clone(),
        online_platform: args.platform.clone(),
        online_url: args.url.clone(),
        expected_student_count: args.expected,
        notes: args.notes.clone(),
        ignore_schedule: args.no_schedule,
    }
}

pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    args: &CheckInArgs,
    now: DateTime<Utc>,
) -> Result<SessionEntry> {
    let session = engine.check_in(identity, params(args), now).await?;

    if args.json {
        write_json(writer, &session)?;
    } else {
        writeln!(writer, "Checked in.")?;
        write_session(writer, &session, engine.config().timezone, now)?;
        if engine.monitor_status(&session.id).is_some() {
            writeln!(
                writer,
                "Geofence monitoring every {}s.",
                engine.config().monitor_interval().as_secs()
            )?;
        }
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    use att_core::{StateError, WorkMode};
    use att_engine::{EngineError, LocationError};
    use clap::Parser;
    use insta::assert_snapshot;

    use crate::commands::util::test_support::{center, engine_at, identity, monday_at, redact};
    use crate::{Cli, Commands};

    fn args(argv: &[&str]) -> CheckInArgs {
        let cli = Cli::try_parse_from(std::iter::once("att").chain(argv.iter().copied())).unwrap();
        let Some(Commands::CheckIn(args)) = cli.command else {
            panic!("expected check-in");
        };
        args
    }

    #[tokio::test]
    async fn onsite_check_in_uses_nearby_location() {
        let engine = engine_at(Some(center()));
        let mut output = Vec::new();

        let session = run(
            &mut output,
            &engine,
            &identity(),
            &args(&["check-in", "--type", "teaching", "--course", "Physics"]),
            monday_at(8, 0),
        )
        .await
        .unwrap();

        assert_eq!(session.work_mode, WorkMode::Onsite);
        assert_snapshot!(redact(output, &session.id), @r"
        Checked in.
        Session [ID] (active)
          Type:        teaching (onsite)
          Course:      Physics
          Location:    campus
          Checked in:  2025-03-10 08:00
          Worked:      0h 00m
        Geofence monitoring every 30s.
        ");
    }

    #[tokio::test]
    async fn remote_check_in_needs_no_position() {
        let engine = engine_at(None);
        let mut output = Vec::new();

        let session = run(
            &mut output,
            &engine,
            &identity(),
            &args(&["check-in", "--type", "prep", "--mode", "remote", "--json"]),
            monday_at(8, 0),
        )
        .await
        .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["id"], session.id.as_str());
        assert_eq!(json["work_mode"], "remote");
        assert_eq!(json["state"], "active");
    }

    #[tokio::test]
    async fn onsite_without_position_is_rejected() {
        let engine = engine_at(None);
        let err = run(
            &mut Vec::new(),
            &engine,
            &identity(),
            &args(&["check-in", "--type", "meeting"]),
            monday_at(8, 0),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Location(LocationError::Unavailable { .. }))
        ));
    }

    #[tokio::test]
    async fn second_check_in_is_rejected() {
        let engine = engine_at(Some(center()));
        let check_in = args(&["check-in", "--type", "admin", "--mode", "remote"]);
        run(&mut Vec::new(), &engine, &identity(), &check_in, monday_at(8, 0))
            .await
            .unwrap();

        let err = run(&mut Vec::new(), &engine, &identity(), &check_in, monday_at(8, 5))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::State(StateError::AlreadyActive { .. }))
        ));
    }
}
