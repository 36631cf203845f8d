//! Session lifecycle.
//!
//! ```text
//! Idle --check_in--> Active --pause--> Paused --resume--> Active
//!                      |                  |
//!                      +----check_out-----+--> Closed
//! ```
//!
//! Idle is the absence of an open entry. Every transition validates before it
//! mutates anything, so a rejected transition leaves the entry untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounting;
use crate::error::{SessionError, StateError, ValidationError};
use crate::special_case::{self, BreakType, CaseEffect, CaseOutcome, SpecialCase, SpecialCaseEvent};
use crate::types::{
    CheckOutSource, EntryType, Identity, LocationId, OrgId, ScheduleEntryId, SessionId, UserId,
    WorkMode, define_string_enum,
};

define_string_enum!(
    /// Persisted lifecycle state of a session entry.
    SessionState, "session state" {
        Active => "active",
        Paused => "paused",
        Closed => "closed",
    }
);

/// A requested lifecycle transition, used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Pause,
    Resume,
    CheckOut,
    SpecialCase,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::CheckOut => "check out",
            Self::SpecialCase => "report a special case on",
        };
        f.write_str(s)
    }
}

impl Default for EntryType {
    fn default() -> Self {
        Self::Other
    }
}

impl Default for WorkMode {
    fn default() -> Self {
        Self::Onsite
    }
}

/// Caller-supplied check-in parameters, possibly pre-filled from a schedule
/// match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub entry_type: EntryType,
    pub work_mode: WorkMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_entry_id: Option<ScheduleEntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CheckInRequest {
    /// Checks the fields required by the entry type and work mode.
    ///
    /// `schedule_bypass` is true when an onsite schedule match stands in for
    /// an explicit location.
    pub fn validate(&self, schedule_bypass: bool) -> Result<(), ValidationError> {
        if self.entry_type == EntryType::Teaching && is_blank(self.course_name.as_deref()) {
            return Err(ValidationError::MissingCourseName);
        }
        if self.work_mode == WorkMode::Online && is_blank(self.online_platform.as_deref()) {
            return Err(ValidationError::MissingPlatform);
        }
        if self.work_mode == WorkMode::Onsite && self.location_id.is_none() && !schedule_bypass {
            return Err(ValidationError::LocationRequired);
        }
        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// One check-in to check-out work period. The aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: SessionId,
    pub user_id: UserId,
    pub org_id: OrgId,
    pub entry_type: EntryType,
    pub work_mode: WorkMode,
    pub state: SessionState,
    pub check_in_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_source: Option<CheckOutSource>,
    /// Start of the currently open pause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    /// Accumulated minutes of completed pauses. Never decreases.
    pub paused_duration_minutes: i64,
    /// Worked minutes captured when the current pause began.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worked_minutes_at_pause: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_entry_id: Option<ScheduleEntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_url: Option<String>,
    /// Append-only audit trail.
    #[serde(default)]
    pub special_case_log: Vec<SpecialCaseEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionEntry {
    /// Opens a new active session after validating the request.
    ///
    /// The caller is responsible for ensuring the user has no other open
    /// session.
    pub fn check_in(
        identity: &Identity,
        request: CheckInRequest,
        schedule_bypass: bool,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        request.validate(schedule_bypass)?;
        Ok(Self {
            id: SessionId::generate(),
            user_id: identity.user_id.clone(),
            org_id: identity.org_id.clone(),
            entry_type: request.entry_type,
            work_mode: request.work_mode,
            state: SessionState::Active,
            check_in_time: now,
            check_out_time: None,
            check_out_source: None,
            paused_at: None,
            paused_duration_minutes: 0,
            worked_minutes_at_pause: None,
            schedule_entry_id: request.schedule_entry_id,
            location_id: request.location_id,
            course_name: request.course_name,
            online_platform: request.online_platform,
            online_url: request.online_url,
            special_case_log: Vec::new(),
            actual_student_count: None,
            expected_student_count: request.expected_student_count,
            notes: request.notes,
        })
    }

    /// Whether the session has no check-out time yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// Worked minutes as of `now`.
    #[must_use]
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        accounting::elapsed_worked_minutes(self, now)
    }

    /// Pauses an active session and logs the break.
    pub fn pause(
        &mut self,
        reason: &str,
        break_type: BreakType,
        duration_hint: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        self.require(Transition::Pause, &[SessionState::Active])?;
        let event = special_case::break_event(self, reason, break_type, duration_hint, now);
        self.enter_pause(now);
        self.special_case_log.push(event);
        Ok(())
    }

    /// Resumes a paused session, folding the pause into the paused total.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), StateError> {
        self.require(Transition::Resume, &[SessionState::Paused])?;
        self.leave_pause(now);
        Ok(())
    }

    /// Closes an active or paused session.
    pub fn check_out(
        &mut self,
        source: CheckOutSource,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), StateError> {
        self.require(
            Transition::CheckOut,
            &[SessionState::Active, SessionState::Paused],
        )?;
        self.close(source, notes, now);
        Ok(())
    }

    /// Runs a special case handler and applies its effect.
    ///
    /// The event is always logged. A pause effect on an already paused
    /// session only logs.
    pub fn apply_special_case(
        &mut self,
        case: &SpecialCase,
        now: DateTime<Utc>,
    ) -> Result<CaseOutcome, SessionError> {
        self.require(
            Transition::SpecialCase,
            &[SessionState::Active, SessionState::Paused],
        )?;
        let outcome = special_case::handle(self, case, now)?;

        if let SpecialCase::LowAttendance {
            actual_count,
            expected_count,
            ..
        } = case
        {
            self.actual_student_count = Some(*actual_count);
            self.expected_student_count = Some(*expected_count);
        }
        self.special_case_log.push(outcome.event.clone());

        match outcome.effect {
            CaseEffect::None => {}
            CaseEffect::Pause => {
                if self.state == SessionState::Active {
                    self.enter_pause(now);
                }
            }
            CaseEffect::Close => {
                self.close(CheckOutSource::Manual, Some(outcome.message.clone()), now);
            }
        }
        Ok(outcome)
    }

    fn require(&self, action: Transition, allowed: &[SessionState]) -> Result<(), StateError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(StateError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn enter_pause(&mut self, now: DateTime<Utc>) {
        self.worked_minutes_at_pause = Some(self.elapsed_minutes(now));
        self.state = SessionState::Paused;
        self.paused_at = Some(now);
    }

    fn leave_pause(&mut self, now: DateTime<Utc>) {
        self.paused_duration_minutes += accounting::open_pause_minutes(self, now);
        self.state = SessionState::Active;
        self.paused_at = None;
        self.worked_minutes_at_pause = None;
    }

    fn close(&mut self, source: CheckOutSource, notes: Option<String>, now: DateTime<Utc>) {
        if self.is_paused() {
            self.leave_pause(now);
        }
        self.state = SessionState::Closed;
        self.check_out_time = Some(now);
        self.check_out_source = Some(source);
        if let Some(note) = notes.filter(|n| !n.trim().is_empty()) {
            self.notes = Some(match self.notes.take() {
                Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
                _ => note,
            });
        }
    }
}
