//! Shared helpers for CLI commands.

use std::io::Write;

use anyhow::{Context, Result};
use att_core::accounting::format_minutes;
use att_core::{Coordinate, Identity, SessionEntry, SessionId};
use att_db::Database;
use att_engine::SessionOrchestrator;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::Config;
use crate::cli::SessionArg;
use crate::location::DeviceLocation;

/// The orchestrator as the CLI runs it.
pub type Engine = SessionOrchestrator<Database, DeviceLocation>;

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Builds an orchestrator over the configured database.
///
/// `fixed` is a position given on the command line; without one the
/// configured location file is consulted on each reading.
pub fn open_engine(config: &Config, fixed: Option<Coordinate>) -> Result<Engine> {
    let db = open_database(config)?;
    let provider = DeviceLocation::new(fixed, config.location_file.clone());
    Ok(SessionOrchestrator::new(db, provider, config.engine()?))
}

/// The session named on the command line, or the user's open session.
pub fn target_session(engine: &Engine, identity: &Identity, target: &SessionArg) -> Result<SessionId> {
    if let Some(id) = &target.session {
        return Ok(id.clone());
    }
    engine
        .open_session(&identity.user_id)?
        .map(|session| session.id)
        .context("no open session (check in first)")
}

/// Formats an instant as local wall-clock time.
pub fn local_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

/// Writes a human-readable summary of a session.
pub fn write_session<W: Write>(
    writer: &mut W,
    session: &SessionEntry,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<()> {
    writeln!(writer, "Session {} ({})", session.id, session.state)?;
    writeln!(
        writer,
        "  Type:        {} ({})",
        session.entry_type, session.work_mode
    )?;
    if let Some(course) = &session.course_name {
        writeln!(writer, "  Course:      {course}")?;
    }
    if let Some(location) = &session.location_id {
        writeln!(writer, "  Location:    {location}")?;
    }
    if let Some(platform) = &session.online_platform {
        match &session.online_url {
            Some(url) => writeln!(writer, "  Platform:    {platform} ({url})")?,
            None => writeln!(writer, "  Platform:    {platform}")?,
        }
    }
    if let Some(schedule) = &session.schedule_entry_id {
        writeln!(writer, "  Schedule:    {schedule}")?;
    }
    writeln!(
        writer,
        "  Checked in:  {}",
        local_time(session.check_in_time, tz)
    )?;
    if let Some(paused_at) = session.paused_at {
        writeln!(writer, "  Paused at:   {}", local_time(paused_at, tz))?;
    }
    if let Some(checked_out) = session.check_out_time {
        let source = session
            .check_out_source
            .map_or("manual", |source| source.as_str());
        writeln!(
            writer,
            "  Checked out: {} ({source})",
            local_time(checked_out, tz)
        )?;
    }
    writeln!(
        writer,
        "  Worked:      {}",
        format_minutes(session.elapsed_minutes(now))
    )?;
    if session.paused_duration_minutes > 0 {
        writeln!(
            writer,
            "  Paused:      {}",
            format_minutes(session.paused_duration_minutes)
        )?;
    }
    if let (Some(actual), Some(expected)) =
        (session.actual_student_count, session.expected_student_count)
    {
        writeln!(writer, "  Attendance:  {actual}/{expected}")?;
    }
    if !session.special_case_log.is_empty() {
        writeln!(writer, "  Events:")?;
        for event in &session.special_case_log {
            let time = event.timestamp.with_timezone(&tz).format("%H:%M");
            if event.reason.is_empty() {
                writeln!(writer, "    {time} {} ({})", event.case_type, event.action)?;
            } else {
                writeln!(
                    writer,
                    "    {time} {} ({}): {}",
                    event.case_type, event.action, event.reason
                )?;
            }
        }
    }
    if let Some(notes) = &session.notes {
        for (index, line) in notes.lines().enumerate() {
            let label = if index == 0 { "  Notes:       " } else { "               " };
            writeln!(writer, "{label}{line}")?;
        }
    }
    Ok(())
}

/// Writes a value as pretty JSON.
pub fn write_json<W: Write, T: serde::Serialize>(writer: &mut W, value: &T) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}
