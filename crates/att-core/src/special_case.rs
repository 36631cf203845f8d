//! Special case handling.
//!
//! Exceptional in-session events form a closed set. Each variant of
//! [`SpecialCase`] maps to exactly one handler arm in [`handle`], which
//! decides the effect on the session and builds the audit event. Handlers
//! never mutate the session themselves; [`SessionEntry::apply_special_case`]
//! applies the outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ValidationError;
use crate::session::SessionEntry;
use crate::types::define_string_enum;

/// Shortest accepted meal break, in minutes.
pub const MEAL_BREAK_MIN_MINUTES: u32 = 1;

/// Longest accepted meal break, in minutes.
pub const MEAL_BREAK_MAX_MINUTES: u32 = 120;

define_string_enum!(
    /// Kind of audit entry in a session's special case log.
    CaseType, "case type" {
        /// A plain pause requested through `pause`.
        Break => "break",
        Emergency => "emergency",
        NoStudents => "no_students",
        LowAttendance => "low_attendance",
        Infrastructure => "infrastructure",
        MealBreak => "meal_break",
    }
);

define_string_enum!(
    /// Why a worker paused.
    BreakType, "break type" {
        Short => "short",
        Meal => "meal",
        Personal => "personal",
        Other => "other",
    }
);

define_string_enum!(
    EmergencyKind, "emergency kind" {
        Medical => "medical",
        Security => "security",
        Weather => "weather",
        Evacuation => "evacuation",
        Fire => "fire",
        Other => "other",
    }
);

define_string_enum!(
    NoStudentsAction, "no-students action" {
        Wait => "wait",
        Cancel => "cancel",
        Online => "online",
        Record => "record",
    }
);

define_string_enum!(
    LowAttendanceAction, "low-attendance action" {
        Continue => "continue",
        Merge => "merge",
        Reschedule => "reschedule",
        Record => "record",
    }
);

define_string_enum!(
    FailureType, "failure type" {
        Power => "power",
        Network => "network",
        Equipment => "equipment",
        Room => "room",
        Other => "other",
    }
);

define_string_enum!(
    InfrastructureAction, "infrastructure action" {
        Relocate => "relocate",
        Reschedule => "reschedule",
        Offline => "offline",
        WaitRepair => "wait_repair",
    }
);

/// An exceptional in-session event reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecialCase {
    /// Pauses, or closes on evacuation/fire. Never auto-resumes.
    Emergency {
        kind: EmergencyKind,
        #[serde(default)]
        reason: String,
    },
    /// Only `cancel` closes the session.
    NoStudents {
        action: NoStudentsAction,
        #[serde(default)]
        reason: String,
    },
    /// Only `reschedule` pauses.
    LowAttendance {
        actual_count: u32,
        expected_count: u32,
        action: LowAttendanceAction,
        #[serde(default)]
        reason: String,
    },
    /// `reschedule` and `wait_repair` pause.
    Infrastructure {
        failure_type: FailureType,
        action: InfrastructureAction,
        #[serde(default)]
        reason: String,
    },
    /// Pauses for a declared duration. Resuming is always explicit.
    MealBreak {
        duration_minutes: u32,
        #[serde(default)]
        reason: String,
    },
}

impl SpecialCase {
    #[must_use]
    pub const fn case_type(&self) -> CaseType {
        match self {
            Self::Emergency { .. } => CaseType::Emergency,
            Self::NoStudents { .. } => CaseType::NoStudents,
            Self::LowAttendance { .. } => CaseType::LowAttendance,
            Self::Infrastructure { .. } => CaseType::Infrastructure,
            Self::MealBreak { .. } => CaseType::MealBreak,
        }
    }
}

/// What a handler does to the session besides logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseEffect {
    None,
    Pause,
    Close,
}

/// Immutable audit entry appended to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialCaseEvent {
    pub case_type: CaseType,
    pub action: String,
    pub reason: String,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

/// Result of a handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub effect: CaseEffect,
    pub event: SpecialCaseEvent,
    /// Human-readable summary, also used as the check-out note on close.
    pub message: String,
}

/// Decides the outcome of `case` for `session`.
///
/// Validation failures are returned before anything is decided, so an
/// invalid case never produces a log entry.
pub fn handle(
    session: &SessionEntry,
    case: &SpecialCase,
    now: DateTime<Utc>,
) -> Result<CaseOutcome, ValidationError> {
    let worked_minutes = session.elapsed_minutes(now);

    let (effect, action, reason, payload, message) = match case {
        SpecialCase::Emergency { kind, reason } => {
            let closes = matches!(kind, EmergencyKind::Evacuation | EmergencyKind::Fire);
            let (effect, message) = if closes {
                (CaseEffect::Close, format!("Emergency ({kind}): session closed"))
            } else {
                (CaseEffect::Pause, format!("Emergency ({kind}): session paused"))
            };
            let payload = json!({ "kind": kind, "worked_minutes": worked_minutes });
            (effect, kind.as_str(), reason, payload, message)
        }
        SpecialCase::NoStudents { action, reason } => {
            let (effect, message) = match action {
                NoStudentsAction::Cancel => (
                    CaseEffect::Close,
                    "No students: class cancelled, session closed".to_string(),
                ),
                NoStudentsAction::Wait => (
                    CaseEffect::None,
                    "No students: waiting for arrivals".to_string(),
                ),
                NoStudentsAction::Online => (
                    CaseEffect::None,
                    "No students: moving the class online".to_string(),
                ),
                NoStudentsAction::Record => (
                    CaseEffect::None,
                    "No students: recorded".to_string(),
                ),
            };
            let payload = json!({ "course_name": session.course_name });
            (effect, action.as_str(), reason, payload, message)
        }
        SpecialCase::LowAttendance {
            actual_count,
            expected_count,
            action,
            reason,
        } => {
            if *expected_count == 0 {
                return Err(ValidationError::InvalidAttendance {
                    actual: *actual_count,
                    expected: *expected_count,
                });
            }
            let rate = f64::from(*actual_count) / f64::from(*expected_count) * 100.0;
            let effect = if *action == LowAttendanceAction::Reschedule {
                CaseEffect::Pause
            } else {
                CaseEffect::None
            };
            let message = format!(
                "Low attendance: {actual_count}/{expected_count} ({rate:.1}%), {action}"
            );
            let payload = json!({
                "actual_count": actual_count,
                "expected_count": expected_count,
                "attendance_rate": (rate * 10.0).round() / 10.0,
            });
            (effect, action.as_str(), reason, payload, message)
        }
        SpecialCase::Infrastructure {
            failure_type,
            action,
            reason,
        } => {
            let effect = match action {
                InfrastructureAction::Reschedule | InfrastructureAction::WaitRepair => {
                    CaseEffect::Pause
                }
                InfrastructureAction::Relocate | InfrastructureAction::Offline => CaseEffect::None,
            };
            let message = format!("Infrastructure failure ({failure_type}): {action}");
            let payload = json!({ "failure_type": failure_type });
            (effect, action.as_str(), reason, payload, message)
        }
        SpecialCase::MealBreak {
            duration_minutes,
            reason,
        } => {
            if !(MEAL_BREAK_MIN_MINUTES..=MEAL_BREAK_MAX_MINUTES).contains(duration_minutes) {
                return Err(ValidationError::InvalidMealBreak {
                    value: *duration_minutes,
                    min: MEAL_BREAK_MIN_MINUTES,
                    max: MEAL_BREAK_MAX_MINUTES,
                });
            }
            let message = format!("Meal break: {duration_minutes} minutes");
            let payload = json!({
                "duration_minutes": duration_minutes,
                "expected_return": now + chrono::Duration::minutes(i64::from(*duration_minutes)),
            });
            (CaseEffect::Pause, "pause", reason, payload, message)
        }
    };

    tracing::debug!(
        session = %session.id,
        case = %case.case_type(),
        action,
        ?effect,
        "special case handled"
    );

    Ok(CaseOutcome {
        effect,
        event: SpecialCaseEvent {
            case_type: case.case_type(),
            action: action.to_string(),
            reason: reason.clone(),
            payload,
            timestamp: now,
        },
        message,
    })
}

/// Builds the audit entry for a plain pause.
pub(crate) fn break_event(
    session: &SessionEntry,
    reason: &str,
    break_type: BreakType,
    duration_hint: Option<u32>,
    now: DateTime<Utc>,
) -> SpecialCaseEvent {
    SpecialCaseEvent {
        case_type: CaseType::Break,
        action: break_type.as_str().to_string(),
        reason: reason.to_string(),
        payload: json!({
            "duration_minutes": duration_hint,
            "worked_minutes": session.elapsed_minutes(now),
        }),
        timestamp: now,
    }
}
