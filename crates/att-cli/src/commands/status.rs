//! Status command for showing the open session and recent history.

use std::io::Write;

use anyhow::Result;
use att_core::accounting::format_minutes;
use att_core::{Identity, SessionEntry};
use att_engine::MonitorStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::commands::util::{Engine, local_time, write_json, write_session};

/// How many closed sessions to list.
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
struct StatusReport {
    open: Option<SessionEntry>,
    monitor: Option<MonitorStatus>,
    recent: Vec<SessionEntry>,
}

pub fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    json: bool,
    now: DateTime<Utc>,
) -> Result<()> {
    let sessions = engine.sessions(&identity.user_id)?;
    let (open, closed): (Vec<_>, Vec<_>) = sessions.into_iter().partition(SessionEntry::is_open);
    let open = open.into_iter().next();
    let monitor = open
        .as_ref()
        .and_then(|session| engine.monitor_status(&session.id));
    let report = StatusReport {
        open,
        monitor,
        recent: closed.into_iter().take(RECENT_LIMIT).collect(),
    };

    if json {
        return write_json(writer, &report);
    }

    let tz = engine.config().timezone;
    writeln!(writer, "Attendance status for {}", identity.user_id)?;

    match &report.open {
        Some(session) => write_session(writer, session, tz, now)?,
        None => writeln!(writer, "No open session.")?,
    }
    if let Some(monitor) = &report.monitor {
        write_monitor(writer, monitor)?;
    }

    if !report.recent.is_empty() {
        writeln!(writer, "Recent:")?;
        for session in &report.recent {
            writeln!(
                writer,
                "- {}  {:<8}  {}  {}",
                local_time(session.check_in_time, tz),
                session.entry_type.as_str(),
                format_minutes(session.elapsed_minutes(now)),
                session.course_name.as_deref().unwrap_or("-"),
            )?;
        }
    }
    Ok(())
}

fn write_monitor<W: Write>(writer: &mut W, monitor: &MonitorStatus) -> Result<()> {
    write!(writer, "Monitor: {} checks", monitor.checks)?;
    if let Some(distance) = monitor.last_distance_meters {
        write!(writer, ", last {distance:.0} m from center")?;
    }
    writeln!(writer)?;
    if let Some(warning) = &monitor.warning {
        writeln!(writer, "  warning: {warning}")?;
    }
    Ok(())
}
