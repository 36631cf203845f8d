//! Worked-time accounting.
//!
//! Only check-in, check-out, the pause start and the accumulated paused
//! minutes are persisted. Elapsed time is derived on demand so a stored
//! counter can never drift from the clock.

use chrono::{DateTime, Utc};

use crate::session::{SessionEntry, SessionState};

/// Whole minutes from `from` to `to`, clamped at zero.
#[must_use]
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes().max(0)
}

/// Worked minutes for `session` as of `now`.
///
/// The interval ends at `now` while active, at the pause start while paused
/// (so the counter is frozen) and at the check-out time once closed.
#[must_use]
pub fn elapsed_worked_minutes(session: &SessionEntry, now: DateTime<Utc>) -> i64 {
    let end = match session.state {
        SessionState::Active => now,
        SessionState::Paused => session.paused_at.unwrap_or(now),
        SessionState::Closed => session.check_out_time.unwrap_or(now),
    };
    (minutes_between(session.check_in_time, end) - session.paused_duration_minutes).max(0)
}

/// Minutes of the currently open pause, zero when not paused.
#[must_use]
pub fn open_pause_minutes(session: &SessionEntry, now: DateTime<Utc>) -> i64 {
    match (session.state, session.paused_at) {
        (SessionState::Paused, Some(paused_at)) => minutes_between(paused_at, now),
        _ => 0,
    }
}

/// Formats minutes as `1h 05m`.
#[must_use]
pub fn format_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    use crate::session::{CheckInRequest, Transition};
    use crate::special_case::BreakType;
    use crate::types::{EntryType, Identity, OrgId, UserId, WorkMode};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap()
    }

    fn remote_session() -> SessionEntry {
        let identity = Identity::worker(UserId::new("u").unwrap(), OrgId::new("o").unwrap());
        let request = CheckInRequest {
            entry_type: EntryType::Admin,
            work_mode: WorkMode::Remote,
            ..CheckInRequest::default()
        };
        SessionEntry::check_in(&identity, request, false, t0()).unwrap()
    }

    #[test]
    fn minutes_between_clamps_negative() {
        assert_eq!(minutes_between(t0(), t0() - Duration::minutes(5)), 0);
        assert_eq!(minutes_between(t0(), t0() + Duration::seconds(119)), 1);
    }

    #[test]
    fn elapsed_grows_while_active() {
        let session = remote_session();
        assert_eq!(elapsed_worked_minutes(&session, t0()), 0);
        assert_eq!(elapsed_worked_minutes(&session, t0() + Duration::minutes(45)), 45);
        // Clock skew before check-in never goes negative
        assert_eq!(elapsed_worked_minutes(&session, t0() - Duration::hours(1)), 0);
    }

    #[test]
    fn elapsed_is_frozen_while_paused_and_excludes_pause_after_resume() {
        let mut session = remote_session();
        session
            .pause("coffee", BreakType::Short, None, t0() + Duration::minutes(30))
            .unwrap();
        for later in [31, 45, 90] {
            assert_eq!(
                elapsed_worked_minutes(&session, t0() + Duration::minutes(later)),
                30
            );
        }
        assert_eq!(open_pause_minutes(&session, t0() + Duration::minutes(45)), 15);

        session.resume(t0() + Duration::minutes(50)).unwrap();
        assert_eq!(session.paused_duration_minutes, 20);
        assert_eq!(elapsed_worked_minutes(&session, t0() + Duration::minutes(50)), 30);
        assert_eq!(elapsed_worked_minutes(&session, t0() + Duration::minutes(80)), 60);
    }

    #[test]
    fn closed_session_is_measured_to_check_out() {
        let mut session = remote_session();
        session
            .check_out(
                crate::types::CheckOutSource::Manual,
                None,
                t0() + Duration::minutes(95),
            )
            .unwrap();
        assert_eq!(elapsed_worked_minutes(&session, t0() + Duration::days(3)), 95);
        assert!(matches!(
            session.resume(t0()),
            Err(crate::error::StateError::InvalidTransition {
                action: Transition::Resume,
                ..
            })
        ));
    }

    #[test]
    fn format_minutes_pads() {
        assert_eq!(format_minutes(65), "1h 05m");
        assert_eq!(format_minutes(0), "0h 00m");
        assert_eq!(format_minutes(-3), "0h 00m");
    }
}
