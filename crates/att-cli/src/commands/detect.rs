//! Schedule detection.

use std::io::Write;

use anyhow::Result;
use att_core::{Identity, ScheduleMatch};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::cli::DetectArgs;
use crate::commands::util::{Engine, local_time, write_json};

pub fn run<W: Write>(
    writer: &mut W,
    engine: &Engine,
    identity: &Identity,
    args: &DetectArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let at = args.at.unwrap_or(now);
    let tz = engine.config().timezone;

    if args.all {
        let candidates = engine.schedule_candidates(&identity.user_id, at);
        if args.json {
            return write_json(writer, &candidates);
        }
        if candidates.is_empty() {
            writeln!(writer, "No schedule entries around {}.", local_time(at, tz))?;
        }
        for candidate in &candidates {
            write_match(writer, candidate, tz)?;
        }
        return Ok(());
    }

    let found = engine.detect_schedule(&identity.user_id, at);
    if args.json {
        return write_json(writer, &found);
    }
    match found {
        Some(found) => write_match(writer, &found, tz)?,
        None => writeln!(writer, "No schedule entry matches {}.", local_time(at, tz))?,
    }
    Ok(())
}

fn write_match<W: Write>(writer: &mut W, found: &ScheduleMatch, tz: Tz) -> Result<()> {
    let verdict = if found.is_match { "match" } else { "below threshold" };
    writeln!(
        writer,
        "{} ({}) {}: {}-{}, {}",
        found.course_name,
        found.schedule_entry_id,
        verdict,
        found.starts_at.with_timezone(&tz).format("%H:%M"),
        found.ends_at.with_timezone(&tz).format("%H:%M"),
        found.location_type,
    )?;
    writeln!(
        writer,
        "  confidence {}, {:+} min from start",
        found.confidence.value(),
        found.variance_minutes
    )?;
    if let Some(platform) = &found.online_platform {
        writeln!(writer, "  platform {platform}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use att_core::{LocationType, ScheduleDay, ScheduleEntry, ScheduleEntryId, UserId};
    use att_db::Database;
    use att_engine::{EngineConfig, SessionOrchestrator};
    use chrono::{NaiveTime, Weekday};
    use insta::assert_snapshot;

    use crate::commands::util::test_support::{identity, monday_at};
    use crate::location::DeviceLocation;

    fn entry(id: &str, course: &str, start: (u32, u32), end: (u32, u32)) -> ScheduleEntry {
        ScheduleEntry {
            id: ScheduleEntryId::new(id).unwrap(),
            user_id: UserId::new("lecturer").unwrap(),
            course_name: course.into(),
            day: ScheduleDay::Weekly(Weekday::Mon),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            location_type: LocationType::Online,
            online_platform: Some("zoom".into()),
            online_url: None,
        }
    }

    fn engine() -> Engine {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_schedule_entry(&entry("phys", "Physics", (9, 0), (10, 30)))
            .unwrap();
        db.upsert_schedule_entry(&entry("chem", "Chemistry", (10, 0), (11, 0)))
            .unwrap();
        SessionOrchestrator::new(db, DeviceLocation::default(), EngineConfig::default())
    }

    fn detect(engine: &Engine, args: &DetectArgs) -> String {
        let mut output = Vec::new();
        run(&mut output, engine, &identity(), args, monday_at(0, 0)).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn reports_best_match() {
        let args = DetectArgs {
            at: Some(monday_at(9, 5)),
            all: false,
            json: false,
        };
        assert_snapshot!(detect(&engine(), &args), @r"
        Physics (phys) match: 09:00-10:30, online
          confidence 90, +5 min from start
          platform zoom
        ");
    }

    #[test]
    fn lists_every_candidate() {
        // 09:50 is inside Physics and in the grace window of Chemistry.
        let args = DetectArgs {
            at: Some(monday_at(9, 50)),
            all: true,
            json: false,
        };
        assert_snapshot!(detect(&engine(), &args), @r"
        Chemistry (chem) match: 10:00-11:00, online
          confidence 80, -10 min from start
          platform zoom
        Physics (phys) match: 09:00-10:30, online
          confidence 0, +50 min from start
          platform zoom
        ");
    }

    #[test]
    fn nothing_scheduled() {
        let args = DetectArgs {
            at: Some(monday_at(18, 0)),
            all: false,
            json: false,
        };
        assert_eq!(
            detect(&engine(), &args),
            "No schedule entry matches 2025-03-10 18:00.\n"
        );
    }
}
