//! Storage layer for field attendance sessions.
//!
//! Provides persistence for sessions, work locations, registrations and
//! schedules using `rusqlite`, and implements [`SessionStore`] for the engine.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The engine serializes access through a `Mutex<Database>`.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with nanosecond precision
//! (e.g., `2024-01-15T10:30:00.000000000Z`). The fixed width keeps
//! lexicographic ordering equal to chronological ordering and makes values
//! round-trip exactly.
//!
//! ## One Open Session Per User
//!
//! A partial unique index on `sessions(user_id) WHERE check_out_time IS NULL`
//! backs the engine's per-user locking: a second open session for the same
//! user is rejected by the database itself.
//!
//! ## Special Case Log
//!
//! Log entries live in `special_case_events`, keyed by `(session_id, seq)`.
//! Writes use `INSERT OR IGNORE`, so an entry, once stored, is never rewritten.

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc, Weekday};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use thiserror::Error;

use att_core::{
    Coordinate, LocationId, LocationRegistration, OrgId, ScheduleDay, ScheduleEntry,
    ScheduleEntryId, SessionEntry, SessionId, SessionStore, SpecialCaseEvent, UserId,
    WorkLocation,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {entity} {id}: {timestamp}")]
    TimestampParse {
        entity: &'static str,
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored value does not fit the domain model.
    #[error("invalid {entity} data for {id}: {message}")]
    InvalidData {
        entity: &'static str,
        id: String,
        message: String,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS work_locations (
                id TEXT PRIMARY KEY,
                org_id TEXT NOT NULL,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                radius_meters REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_work_locations_org ON work_locations(org_id);

            CREATE TABLE IF NOT EXISTS location_registrations (
                user_id TEXT NOT NULL,
                location_id TEXT NOT NULL,
                verified INTEGER NOT NULL DEFAULT 0,
                registered_at TEXT NOT NULL,
                source TEXT NOT NULL,
                notes TEXT,
                PRIMARY KEY (user_id, location_id),
                FOREIGN KEY (location_id) REFERENCES work_locations(id) ON DELETE CASCADE
            );

            -- day_kind: 'weekly' (day_value = 'Mon'..'Sun') or 'date' (day_value = 'YYYY-MM-DD')
            CREATE TABLE IF NOT EXISTS schedule_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                course_name TEXT NOT NULL,
                day_kind TEXT NOT NULL,
                day_value TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                location_type TEXT NOT NULL,
                online_platform TEXT,
                online_url TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_schedule_entries_user ON schedule_entries(user_id);

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                org_id TEXT NOT NULL,
                entry_type TEXT NOT NULL,
                work_mode TEXT NOT NULL,
                state TEXT NOT NULL,
                check_in_time TEXT NOT NULL,
                check_out_time TEXT,
                check_out_source TEXT,
                paused_at TEXT,
                paused_duration_minutes INTEGER NOT NULL DEFAULT 0,
                worked_minutes_at_pause INTEGER,
                schedule_entry_id TEXT,
                location_id TEXT,
                course_name TEXT,
                online_platform TEXT,
                online_url TEXT,
                actual_student_count INTEGER,
                expected_student_count INTEGER,
                notes TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, check_in_time);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_open
                ON sessions(user_id) WHERE check_out_time IS NULL;

            -- Append-only audit trail; payload is JSON
            CREATE TABLE IF NOT EXISTS special_case_events (
                session_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                case_type TEXT NOT NULL,
                action TEXT NOT NULL,
                reason TEXT NOT NULL,
                payload TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (session_id, seq),
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts or replaces a work location.
    pub fn upsert_work_location(&mut self, location: &WorkLocation) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO work_locations (id, org_id, name, latitude, longitude, radius_meters)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                org_id = excluded.org_id,
                name = excluded.name,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                radius_meters = excluded.radius_meters
            ",
            params![
                location.id.as_str(),
                location.org_id.as_str(),
                location.name,
                location.coordinate.latitude,
                location.coordinate.longitude,
                location.radius_meters,
            ],
        )?;
        Ok(())
    }

    /// Inserts or replaces a schedule entry.
    pub fn upsert_schedule_entry(&mut self, entry: &ScheduleEntry) -> Result<(), DbError> {
        let (day_kind, day_value) = match entry.day {
            ScheduleDay::Weekly(day) => ("weekly", day.to_string()),
            ScheduleDay::Date(date) => ("date", date.format("%Y-%m-%d").to_string()),
        };
        self.conn.execute(
            "
            INSERT OR REPLACE INTO schedule_entries
            (id, user_id, course_name, day_kind, day_value, start_time, end_time,
             location_type, online_platform, online_url)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                entry.id.as_str(),
                entry.user_id.as_str(),
                entry.course_name,
                day_kind,
                day_value,
                entry.start_time.format("%H:%M:%S").to_string(),
                entry.end_time.format("%H:%M:%S").to_string(),
                entry.location_type.as_str(),
                entry.online_platform,
                entry.online_url,
            ],
        )?;
        Ok(())
    }

    /// Marks a registration as verified by an administrator.
    ///
    /// Returns `false` if the user is not registered to the location.
    pub fn verify_registration(
        &mut self,
        user_id: &UserId,
        location_id: &LocationId,
    ) -> Result<bool, DbError> {
        let updated = self.conn.execute(
            "UPDATE location_registrations SET verified = 1 WHERE user_id = ? AND location_id = ?",
            params![user_id.as_str(), location_id.as_str()],
        )?;
        Ok(updated > 0)
    }

    /// Writes the mutable columns of a session still open in the database.
    /// Returns `false`, writing nothing, if the stored row is already closed.
    fn write_session(tx: &Transaction<'_>, session: &SessionEntry) -> Result<bool, DbError> {
        let updated = tx.execute(
            "
            UPDATE sessions SET
                entry_type = ?2,
                work_mode = ?3,
                state = ?4,
                check_out_time = ?5,
                check_out_source = ?6,
                paused_at = ?7,
                paused_duration_minutes = ?8,
                worked_minutes_at_pause = ?9,
                schedule_entry_id = ?10,
                location_id = ?11,
                course_name = ?12,
                online_platform = ?13,
                online_url = ?14,
                actual_student_count = ?15,
                expected_student_count = ?16,
                notes = ?17
            WHERE id = ?1 AND check_out_time IS NULL
            ",
            params![
                session.id.as_str(),
                session.entry_type.as_str(),
                session.work_mode.as_str(),
                session.state.as_str(),
                session.check_out_time.map(format_timestamp),
                session.check_out_source.map(|s| s.as_str()),
                session.paused_at.map(format_timestamp),
                session.paused_duration_minutes,
                session.worked_minutes_at_pause,
                session.schedule_entry_id.as_ref().map(ScheduleEntryId::as_str),
                session.location_id.as_ref().map(LocationId::as_str),
                session.course_name,
                session.online_platform,
                session.online_url,
                session.actual_student_count,
                session.expected_student_count,
                session.notes,
            ],
        )?;
        if updated == 0 {
            return Ok(false);
        }
        Self::append_events(tx, session)?;
        Ok(true)
    }

    fn append_events(tx: &Transaction<'_>, session: &SessionEntry) -> Result<(), DbError> {
        let mut stmt = tx.prepare(
            "
            INSERT OR IGNORE INTO special_case_events
            (session_id, seq, case_type, action, reason, payload, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )?;
        for (seq, event) in session.special_case_log.iter().enumerate() {
            stmt.execute(params![
                session.id.as_str(),
                i64::try_from(seq).unwrap_or(i64::MAX),
                event.case_type.as_str(),
                event.action,
                event.reason,
                event.payload.to_string(),
                format_timestamp(event.timestamp),
            ])?;
        }
        Ok(())
    }

    fn query_sessions(
        &self,
        where_clause: &str,
        param: &str,
    ) -> Result<Vec<SessionEntry>, DbError> {
        let sql = format!(
            "
            SELECT id, user_id, org_id, entry_type, work_mode, state, check_in_time,
                   check_out_time, check_out_source, paused_at, paused_duration_minutes,
                   worked_minutes_at_pause, schedule_entry_id, location_id, course_name,
                   online_platform, online_url, actual_student_count, expected_student_count, notes
            FROM sessions
            WHERE {where_clause}
            ORDER BY check_in_time DESC, id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([param], SessionRow::from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            let row = row?;
            let events = self.session_events(&row.id)?;
            sessions.push(row.into_entry(events)?);
        }
        Ok(sessions)
    }

    fn session_events(&self, session_id: &str) -> Result<Vec<SpecialCaseEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT case_type, action, reason, payload, timestamp
            FROM special_case_events
            WHERE session_id = ?
            ORDER BY seq ASC
            ",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (case_type, action, reason, payload, timestamp) = row?;
            events.push(SpecialCaseEvent {
                case_type: parse_field(&case_type, "special case", session_id)?,
                action,
                reason,
                payload: serde_json::from_str(&payload).map_err(|err| DbError::InvalidData {
                    entity: "special case",
                    id: session_id.to_string(),
                    message: err.to_string(),
                })?,
                timestamp: parse_timestamp(&timestamp, "special case", session_id)?,
            });
        }
        Ok(events)
    }
}

impl SessionStore for Database {
    type Error = DbError;

    fn create_session(&mut self, session: &SessionEntry) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "
            INSERT INTO sessions (id, user_id, org_id, entry_type, work_mode, state, check_in_time)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                session.id.as_str(),
                session.user_id.as_str(),
                session.org_id.as_str(),
                session.entry_type.as_str(),
                session.work_mode.as_str(),
                session.state.as_str(),
                format_timestamp(session.check_in_time),
            ],
        )?;
        Self::write_session(&tx, session)?;
        tx.commit()?;
        tracing::debug!(session = %session.id, user = %session.user_id, "session created");
        Ok(())
    }

    fn update_session(&mut self, session: &SessionEntry) -> Result<bool, DbError> {
        let tx = self.conn.transaction()?;
        let written = Self::write_session(&tx, session)?;
        tx.commit()?;
        if !written {
            tracing::debug!(session = %session.id, "update skipped, session already closed");
        }
        Ok(written)
    }

    fn close_session(&mut self, session: &SessionEntry) -> Result<bool, DbError> {
        if session.check_out_time.is_none() {
            return Err(DbError::InvalidData {
                entity: "session",
                id: session.id.to_string(),
                message: "close requested without a check-out time".to_string(),
            });
        }
        let tx = self.conn.transaction()?;
        let written = Self::write_session(&tx, session)?;
        tx.commit()?;
        if written {
            tracing::debug!(session = %session.id, "session closed");
        } else {
            tracing::debug!(session = %session.id, "close skipped, session already closed");
        }
        Ok(written)
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<SessionEntry>, DbError> {
        Ok(self.query_sessions("id = ?", id.as_str())?.into_iter().next())
    }

    fn open_session(&self, user_id: &UserId) -> Result<Option<SessionEntry>, DbError> {
        Ok(self
            .query_sessions("user_id = ? AND check_out_time IS NULL", user_id.as_str())?
            .into_iter()
            .next())
    }

    fn list_sessions(&self, user_id: &UserId) -> Result<Vec<SessionEntry>, DbError> {
        self.query_sessions("user_id = ?", user_id.as_str())
    }

    fn create_location_registration(
        &mut self,
        registration: &LocationRegistration,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT OR IGNORE INTO location_registrations
            (user_id, location_id, verified, registered_at, source, notes)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
            params![
                registration.user_id.as_str(),
                registration.location_id.as_str(),
                registration.verified,
                format_timestamp(registration.registered_at),
                registration.source.as_str(),
                registration.notes,
            ],
        )?;
        Ok(())
    }

    fn list_location_registrations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LocationRegistration>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, location_id, verified, registered_at, source, notes
            FROM location_registrations
            WHERE user_id = ?
            ORDER BY registered_at DESC, location_id ASC
            ",
        )?;
        let rows = stmt.query_map([user_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;
        let mut registrations = Vec::new();
        for row in rows {
            let (user, location, verified, registered_at, source, notes) = row?;
            registrations.push(LocationRegistration {
                user_id: parse_field(&user, "registration", &location)?,
                registered_at: parse_timestamp(&registered_at, "registration", &location)?,
                source: parse_field(&source, "registration", &location)?,
                location_id: parse_field(&location, "registration", &location)?,
                verified,
                notes,
            });
        }
        Ok(registrations)
    }

    fn list_work_locations(&self, org_id: &OrgId) -> Result<Vec<WorkLocation>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, org_id, name, latitude, longitude, radius_meters
            FROM work_locations
            WHERE org_id = ?
            ORDER BY name ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([org_id.as_str()], LocationRow::from_row)?;
        let mut locations = Vec::new();
        for row in rows {
            locations.push(row?.into_location()?);
        }
        Ok(locations)
    }

    fn get_work_location(&self, id: &LocationId) -> Result<Option<WorkLocation>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, org_id, name, latitude, longitude, radius_meters
                FROM work_locations
                WHERE id = ?
                ",
                [id.as_str()],
                LocationRow::from_row,
            )
            .optional()?;
        row.map(LocationRow::into_location).transpose()
    }

    fn list_schedule_entries(&self, user_id: &UserId) -> Result<Vec<ScheduleEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, user_id, course_name, day_kind, day_value, start_time, end_time,
                   location_type, online_platform, online_url
            FROM schedule_entries
            WHERE user_id = ?
            ORDER BY day_value ASC, start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([user_id.as_str()], |row| {
            Ok(ScheduleRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                course_name: row.get(2)?,
                day_kind: row.get(3)?,
                day_value: row.get(4)?,
                start_time: row.get(5)?,
                end_time: row.get(6)?,
                location_type: row.get(7)?,
                online_platform: row.get(8)?,
                online_url: row.get(9)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }
}

#[derive(Debug)]
struct SessionRow {
    id: String,
    user_id: String,
    org_id: String,
    entry_type: String,
    work_mode: String,
    state: String,
    check_in_time: String,
    check_out_time: Option<String>,
    check_out_source: Option<String>,
    paused_at: Option<String>,
    paused_duration_minutes: i64,
    worked_minutes_at_pause: Option<i64>,
    schedule_entry_id: Option<String>,
    location_id: Option<String>,
    course_name: Option<String>,
    online_platform: Option<String>,
    online_url: Option<String>,
    actual_student_count: Option<u32>,
    expected_student_count: Option<u32>,
    notes: Option<String>,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            org_id: row.get(2)?,
            entry_type: row.get(3)?,
            work_mode: row.get(4)?,
            state: row.get(5)?,
            check_in_time: row.get(6)?,
            check_out_time: row.get(7)?,
            check_out_source: row.get(8)?,
            paused_at: row.get(9)?,
            paused_duration_minutes: row.get(10)?,
            worked_minutes_at_pause: row.get(11)?,
            schedule_entry_id: row.get(12)?,
            location_id: row.get(13)?,
            course_name: row.get(14)?,
            online_platform: row.get(15)?,
            online_url: row.get(16)?,
            actual_student_count: row.get(17)?,
            expected_student_count: row.get(18)?,
            notes: row.get(19)?,
        })
    }

    fn into_entry(self, special_case_log: Vec<SpecialCaseEvent>) -> Result<SessionEntry, DbError> {
        let id = self.id.as_str();
        let optional_timestamp = |value: Option<&String>| {
            value
                .map(|ts| parse_timestamp(ts, "session", id))
                .transpose()
        };
        Ok(SessionEntry {
            user_id: parse_field(&self.user_id, "session", id)?,
            org_id: parse_field(&self.org_id, "session", id)?,
            entry_type: parse_field(&self.entry_type, "session", id)?,
            work_mode: parse_field(&self.work_mode, "session", id)?,
            state: parse_field(&self.state, "session", id)?,
            check_in_time: parse_timestamp(&self.check_in_time, "session", id)?,
            check_out_time: optional_timestamp(self.check_out_time.as_ref())?,
            check_out_source: self
                .check_out_source
                .as_deref()
                .map(|s| parse_field(s, "session", id))
                .transpose()?,
            paused_at: optional_timestamp(self.paused_at.as_ref())?,
            paused_duration_minutes: self.paused_duration_minutes,
            worked_minutes_at_pause: self.worked_minutes_at_pause,
            schedule_entry_id: self
                .schedule_entry_id
                .as_deref()
                .map(|s| parse_field(s, "session", id))
                .transpose()?,
            location_id: self
                .location_id
                .as_deref()
                .map(|s| parse_field(s, "session", id))
                .transpose()?,
            course_name: self.course_name,
            online_platform: self.online_platform,
            online_url: self.online_url,
            special_case_log,
            actual_student_count: self.actual_student_count,
            expected_student_count: self.expected_student_count,
            notes: self.notes,
            id: parse_field(&self.id, "session", &self.id)?,
        })
    }
}

#[derive(Debug)]
struct LocationRow {
    id: String,
    org_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
}

impl LocationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            org_id: row.get(1)?,
            name: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            radius_meters: row.get(5)?,
        })
    }

    fn into_location(self) -> Result<WorkLocation, DbError> {
        let invalid = |message: String| DbError::InvalidData {
            entity: "work location",
            id: self.id.clone(),
            message,
        };
        WorkLocation::new(
            parse_field(&self.id, "work location", &self.id)?,
            parse_field(&self.org_id, "work location", &self.id)?,
            self.name.clone(),
            Coordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            self.radius_meters,
        )
        .map_err(|err| invalid(err.to_string()))
    }
}

#[derive(Debug)]
struct ScheduleRow {
    id: String,
    user_id: String,
    course_name: String,
    day_kind: String,
    day_value: String,
    start_time: String,
    end_time: String,
    location_type: String,
    online_platform: Option<String>,
    online_url: Option<String>,
}

impl ScheduleRow {
    fn into_entry(self) -> Result<ScheduleEntry, DbError> {
        let id = self.id.as_str();
        let invalid = |message: String| DbError::InvalidData {
            entity: "schedule entry",
            id: id.to_string(),
            message,
        };
        let day = match self.day_kind.as_str() {
            "weekly" => ScheduleDay::Weekly(
                self.day_value
                    .parse::<Weekday>()
                    .map_err(|_| invalid(format!("unknown weekday {}", self.day_value)))?,
            ),
            "date" => ScheduleDay::Date(
                NaiveDate::parse_from_str(&self.day_value, "%Y-%m-%d")
                    .map_err(|err| invalid(err.to_string()))?,
            ),
            other => return Err(invalid(format!("unknown day kind {other}"))),
        };
        let parse_time = |value: &str| {
            NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|err| invalid(err.to_string()))
        };
        Ok(ScheduleEntry {
            id: parse_field(id, "schedule entry", id)?,
            user_id: parse_field(&self.user_id, "schedule entry", id)?,
            course_name: self.course_name.clone(),
            day,
            start_time: parse_time(&self.start_time)?,
            end_time: parse_time(&self.end_time)?,
            location_type: parse_field(&self.location_type, "schedule entry", id)?,
            online_platform: self.online_platform.clone(),
            online_url: self.online_url.clone(),
        })
    }
}

/// Parses a stored string into a validated domain type.
fn parse_field<T>(value: &str, entity: &'static str, id: &str) -> Result<T, DbError>
where
    T: std::str::FromStr<Err = att_core::ValidationError>,
{
    value.parse().map_err(|err: att_core::ValidationError| DbError::InvalidData {
        entity,
        id: id.to_string(),
        message: err.to_string(),
    })
}

fn parse_timestamp(timestamp: &str, entity: &'static str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            entity,
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
