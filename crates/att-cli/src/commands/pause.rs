//! Pause command.

use std::io::Write;

use anyhow::Result;
use att_core::Identity;
use att_engine::PauseRequest;
use chrono::{DateTime, Utc};

use crate::cli::PauseArgs;
use crate::commands::util::{Engine, local_time, target_session};

pub async fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    args: &PauseArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let session_id = target_session(engine, identity, &args.target)?;
    let request = PauseRequest {
        reason: args.reason.clone(),
        break_type: args.break_type,
        duration_minutes: args.minutes,
    };
    let session = engine.pause(&session_id, request, now).await?;

    write!(
        writer,
        "Paused at {} ({} break",
        local_time(now, engine.config().timezone),
        args.break_type
    )?;
    match args.minutes {
        Some(minutes) => writeln!(writer, ", {minutes} min).")?,
        None => writeln!(writer, ").")?,
    }
    writeln!(
        writer,
        "Worked so far: {} min",
        session.elapsed_minutes(now)
    )?;
    Ok(())
}
