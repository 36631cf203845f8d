//! Command-line argument definitions.

use std::path::PathBuf;

use anyhow::{Result, bail};
use att_core::special_case::{
    BreakType, EmergencyKind, FailureType, InfrastructureAction, LowAttendanceAction,
    NoStudentsAction,
};
use att_core::{
    Coordinate, EntryType, LocationId, LocationType, ScheduleDay, ScheduleEntryId, SessionId,
    SpecialCase, UserId, WorkMode,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use clap::{Args, Parser, Subcommand};

/// Field attendance tracker.
///
/// Checks field workers in and out of geofenced work locations, matches
/// sessions against their teaching schedule and records special cases.
#[derive(Debug, Parser)]
#[command(name = "att", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check in and open a session.
    CheckIn(CheckInArgs),

    /// Pause the open session.
    Pause(PauseArgs),

    /// Resume a paused session.
    Resume(SessionArg),

    /// Check out and close the session.
    CheckOut(CheckOutArgs),

    /// Report a special case on the open session.
    Case {
        #[command(flatten)]
        target: SessionArg,

        #[command(subcommand)]
        case: CaseCommand,
    },

    /// Show worked minutes of a session.
    Elapsed(SessionArg),

    /// Show which schedule entry matches now.
    Detect(DetectArgs),

    /// Show the open session and recent history.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Watch the open onsite session until it closes.
    Monitor(PositionArgs),

    /// Manage work locations and registrations.
    #[command(subcommand)]
    Locations(LocationsAction),

    /// Manage the teaching schedule.
    #[command(subcommand)]
    Schedule(ScheduleAction),
}

/// Position fix supplied on the command line.
#[derive(Debug, Clone, Args)]
pub struct PositionArgs {
    /// Latitude of the current position.
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the current position.
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

impl PositionArgs {
    pub fn coordinate(&self) -> Result<Option<Coordinate>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinate::new(lat, lon)?)),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SessionArg {
    /// Session to act on. Defaults to the open session.
    #[arg(long)]
    pub session: Option<SessionId>,
}

#[derive(Debug, Clone, Args)]
pub struct CheckInArgs {
    #[command(flatten)]
    pub position: PositionArgs,

    /// Kind of work (teaching, meeting, prep, admin, other).
    #[arg(long = "type")]
    pub entry_type: Option<EntryType>,

    /// Where the work happens (onsite, remote, online).
    #[arg(long)]
    pub mode: Option<WorkMode>,

    /// Course being taught.
    #[arg(long)]
    pub course: Option<String>,

    /// Work location to check in at.
    #[arg(long)]
    pub location: Option<LocationId>,

    /// Online platform (zoom, meet, ...).
    #[arg(long)]
    pub platform: Option<String>,

    /// Online meeting link.
    #[arg(long)]
    pub url: Option<String>,

    /// Number of students expected.
    #[arg(long)]
    pub expected: Option<u32>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Do not pre-fill from the schedule.
    #[arg(long)]
    pub no_schedule: bool,

    /// Keep running and monitor the geofence until the session closes.
    #[arg(long)]
    pub watch: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct PauseArgs {
    #[command(flatten)]
    pub target: SessionArg,

    /// Why the session is paused.
    #[arg(long, default_value = "")]
    pub reason: String,

    /// Kind of break (short, meal, personal, other).
    #[arg(long = "break", default_value = "short")]
    pub break_type: BreakType,

    /// Expected length of the break in minutes.
    #[arg(long)]
    pub minutes: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct CheckOutArgs {
    #[command(flatten)]
    pub target: SessionArg,

    #[arg(long)]
    pub notes: Option<String>,
}

/// Special cases.
#[derive(Debug, Clone, Subcommand)]
pub enum CaseCommand {
    /// An emergency interrupted the session.
    Emergency {
        /// medical, security, weather, evacuation, fire, other.
        kind: EmergencyKind,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// No students showed up.
    NoStudents {
        /// wait, cancel, online, record.
        action: NoStudentsAction,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Fewer students than expected.
    LowAttendance {
        /// Students present.
        #[arg(long)]
        actual: u32,
        /// Students expected.
        #[arg(long)]
        expected: u32,
        /// continue, merge, reschedule, record.
        action: LowAttendanceAction,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Power, network, equipment or room failure.
    Infrastructure {
        /// power, network, equipment, room, other.
        failure: FailureType,
        /// relocate, reschedule, offline, wait_repair.
        action: InfrastructureAction,
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// A declared meal break.
    MealBreak {
        /// Length of the break in minutes (1-120).
        minutes: u32,
        #[arg(long, default_value = "")]
        reason: String,
    },
}

impl CaseCommand {
    pub fn into_case(self) -> SpecialCase {
        match self {
            Self::Emergency { kind, reason } => SpecialCase::Emergency { kind, reason },
            Self::NoStudents { action, reason } => SpecialCase::NoStudents { action, reason },
            Self::LowAttendance {
                actual,
                expected,
                action,
                reason,
            } => SpecialCase::LowAttendance {
                actual_count: actual,
                expected_count: expected,
                action,
                reason,
            },
            Self::Infrastructure {
                failure,
                action,
                reason,
            } => SpecialCase::Infrastructure {
                failure_type: failure,
                action,
                reason,
            },
            Self::MealBreak { minutes, reason } => SpecialCase::MealBreak {
                duration_minutes: minutes,
                reason,
            },
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DetectArgs {
    /// Time to match instead of now (RFC 3339).
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    /// Also list candidates below the match threshold.
    #[arg(long)]
    pub all: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Work location commands.
#[derive(Debug, Clone, Subcommand)]
pub enum LocationsAction {
    /// Add or update a work location.
    Add {
        id: LocationId,
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Geofence radius in meters.
        #[arg(long, default_value_t = 100.0)]
        radius: f64,
    },

    /// List work locations and your registrations.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Request registration at a work location.
    Register {
        id: LocationId,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Verify a user's registration (admin).
    Verify {
        id: LocationId,
        /// User to verify. Defaults to the configured user.
        #[arg(long)]
        user: Option<UserId>,
    },
}

/// Schedule commands.
#[derive(Debug, Clone, Subcommand)]
pub enum ScheduleAction {
    /// Add or replace a schedule entry.
    Add {
        id: ScheduleEntryId,
        #[arg(long)]
        course: String,
        /// Weekday (mon..sun) or a date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_schedule_day)]
        day: ScheduleDay,
        /// Local start time (HH:MM).
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        /// Local end time (HH:MM). Earlier than start means past midnight.
        #[arg(long, value_parser = parse_time)]
        end: NaiveTime,
        /// onsite, online, hybrid.
        #[arg(long = "type", default_value = "onsite")]
        location_type: LocationType,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },

    /// List schedule entries.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_schedule_day(value: &str) -> Result<ScheduleDay> {
    if let Ok(day) = value.parse::<Weekday>() {
        return Ok(ScheduleDay::Weekly(day));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(ScheduleDay::Date(date));
    }
    bail!("expected a weekday (mon..sun) or a date (YYYY-MM-DD), got {value}")
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| anyhow::anyhow!("expected a time as HH:MM, got {value}"))
}
