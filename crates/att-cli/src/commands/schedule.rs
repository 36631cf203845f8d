//! Schedule administration.

use std::io::Write;

use anyhow::{Context, Result};
use att_core::{Identity, ScheduleDay, ScheduleEntry, SessionStore};
use att_db::Database;

use crate::cli::ScheduleAction;
use crate::commands::util::write_json;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    identity: &Identity,
    action: &ScheduleAction,
) -> Result<()> {
    match action {
        ScheduleAction::Add {
            id,
            course,
            day,
            start,
            end,
            location_type,
            platform,
            url,
        } => {
            let entry = ScheduleEntry {
                id: id.clone(),
                user_id: identity.user_id.clone(),
                course_name: course.clone(),
                day: *day,
                start_time: *start,
                end_time: *end,
                location_type: *location_type,
                online_platform: platform.clone(),
                online_url: url.clone(),
            };
            db.upsert_schedule_entry(&entry)
                .context("failed to save schedule entry")?;
            write!(writer, "Saved ")?;
            write_entry(writer, &entry)?;
        }
        ScheduleAction::List { json } => {
            let entries = db.list_schedule_entries(&identity.user_id)?;
            if *json {
                return write_json(writer, &entries);
            }
            if entries.is_empty() {
                writeln!(writer, "No schedule entries.")?;
            }
            for entry in &entries {
                write_entry(writer, entry)?;
            }
        }
    }
    Ok(())
}

fn write_entry<W: Write>(writer: &mut W, entry: &ScheduleEntry) -> Result<()> {
    let day = match entry.day {
        ScheduleDay::Weekly(day) => format!("every {day}"),
        ScheduleDay::Date(date) => format!("on {date}"),
    };
    write!(
        writer,
        "{}: {} {day} {}-{} ({})",
        entry.id,
        entry.course_name,
        entry.start_time.format("%H:%M"),
        entry.end_time.format("%H:%M"),
        entry.location_type
    )?;
    if let Some(platform) = &entry.online_platform {
        write!(writer, " via {platform}")?;
    }
    writeln!(writer)?;
    Ok(())
}
