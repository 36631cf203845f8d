//! Worked-time query.

use std::io::Write;

use anyhow::Result;
use att_core::Identity;
use att_core::accounting::{format_minutes, open_pause_minutes};
use chrono::{DateTime, Utc};

use crate::cli::SessionArg;
use crate::commands::util::{Engine, target_session};

pub fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    target: &SessionArg,
    now: DateTime<Utc>,
) -> Result<()> {
    let session_id = target_session(engine, identity, target)?;
    let session = engine.session(&session_id)?;
    let worked = engine.elapsed_minutes(&session_id, now)?;

    write!(writer, "{} worked", format_minutes(worked))?;
    if session.is_paused() {
        write!(
            writer,
            " (paused for {})",
            format_minutes(open_pause_minutes(&session, now))
        )?;
    } else if !session.is_open() {
        write!(writer, " (closed)")?;
    }
    writeln!(writer)?;
    Ok(())
}
