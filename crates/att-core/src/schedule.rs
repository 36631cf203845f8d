//! Schedule matching.
//!
//! Pairs "now" with a user's recurring schedule to pre-fill a check-in.
//!
//! # Algorithm Summary
//!
//! 1. Expand each entry into concrete occurrences around the local date of `now`
//! 2. Keep occurrences whose window `[start - grace, end]` contains `now`
//! 3. Score each by its signed variance from the start time
//! 4. Rank by confidence, then smallest absolute variance, then earliest start
//!
//! The scoring constants live in [`MatcherConfig`] and are tunable; they are
//! a heuristic, not a contract.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::{Confidence, LocationType, ScheduleEntryId, UserId};

/// Tunable constants for schedule matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minutes before the start time an entry becomes a candidate.
    /// Default: 15.
    pub grace_minutes: i64,

    /// Confidence lost per minute of variance from the start time.
    /// Default: 2.
    pub penalty_per_minute: i64,

    /// Minimum confidence for an entry that has not started yet.
    /// Default: 70.
    pub match_threshold: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            grace_minutes: 15,
            penalty_per_minute: 2,
            match_threshold: 70,
        }
    }
}

/// The day an entry recurs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDay {
    /// Every week on this day.
    Weekly(Weekday),
    /// Once, on this date.
    Date(NaiveDate),
}

impl ScheduleDay {
    fn occurs_on(self, date: NaiveDate) -> bool {
        match self {
            Self::Weekly(day) => date.weekday() == day,
            Self::Date(d) => d == date,
        }
    }
}

/// A recurring, read-only schedule slot.
///
/// Start and end are local wall-clock times; an end at or before the start
/// means the slot runs past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: ScheduleEntryId,
    pub user_id: UserId,
    pub course_name: String,
    pub day: ScheduleDay,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location_type: LocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_url: Option<String>,
}

/// A scored pairing of "now" with a schedule entry. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMatch {
    pub schedule_entry_id: ScheduleEntryId,
    pub course_name: String,
    pub confidence: Confidence,
    /// Signed minutes from the scheduled start to now; negative means early.
    pub variance_minutes: i64,
    pub is_match: bool,
    pub location_type: LocationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_url: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ScheduleMatch {
    /// Whether the match should switch the session to online delivery.
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self.location_type, LocationType::Online | LocationType::Hybrid)
    }
}

/// Confidence for a given variance: `100 - penalty * |variance|`, floored at 0.
#[must_use]
pub fn confidence_for(variance_minutes: i64, config: &MatcherConfig) -> Confidence {
    let penalty = config
        .penalty_per_minute
        .saturating_mul(variance_minutes.saturating_abs());
    Confidence::clamped(100_i64.saturating_sub(penalty))
}

/// Scores every entry whose window contains `now`, best candidate first.
pub fn evaluate(
    entries: &[ScheduleEntry],
    now: DateTime<Utc>,
    tz: Tz,
    config: &MatcherConfig,
) -> Vec<ScheduleMatch> {
    let today = now.with_timezone(&tz).date_naive();
    // Yesterday covers overnight slots, tomorrow covers the grace period
    // before a slot that starts just after midnight.
    let dates: Vec<NaiveDate> = [today.pred_opt(), Some(today), today.succ_opt()]
        .into_iter()
        .flatten()
        .collect();

    let grace = Duration::minutes(config.grace_minutes.max(0));
    let mut candidates = Vec::new();

    for entry in entries {
        for date in &dates {
            if !entry.day.occurs_on(*date) {
                continue;
            }
            let Some((starts_at, ends_at)) = occurrence(entry, *date, tz) else {
                tracing::debug!(entry = %entry.id, %date, "slot falls in a DST gap, skipping");
                continue;
            };
            if now < starts_at - grace || now > ends_at {
                continue;
            }

            let variance_minutes = (now - starts_at).num_minutes();
            let confidence = confidence_for(variance_minutes, config);
            let started = now >= starts_at;
            let is_match = started || confidence.value() >= config.match_threshold;

            candidates.push(ScheduleMatch {
                schedule_entry_id: entry.id.clone(),
                course_name: entry.course_name.clone(),
                confidence,
                variance_minutes,
                is_match,
                location_type: entry.location_type,
                online_platform: entry.online_platform.clone(),
                online_url: entry.online_url.clone(),
                starts_at,
                ends_at,
            });
        }
    }

    candidates.sort_by(rank);
    candidates
}

/// The best matching entry for `now`, if any.
pub fn best_match(
    entries: &[ScheduleEntry],
    now: DateTime<Utc>,
    tz: Tz,
    config: &MatcherConfig,
) -> Option<ScheduleMatch> {
    evaluate(entries, now, tz, config)
        .into_iter()
        .find(|candidate| candidate.is_match)
}

fn rank(a: &ScheduleMatch, b: &ScheduleMatch) -> Ordering {
    b.confidence
        .cmp(&a.confidence)
        .then_with(|| {
            a.variance_minutes
                .unsigned_abs()
                .cmp(&b.variance_minutes.unsigned_abs())
        })
        .then_with(|| a.starts_at.cmp(&b.starts_at))
}

fn occurrence(
    entry: &ScheduleEntry,
    date: NaiveDate,
    tz: Tz,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = tz
        .from_local_datetime(&date.and_time(entry.start_time))
        .earliest()?;
    let end_date = if entry.end_time <= entry.start_time {
        date.succ_opt()?
    } else {
        date
    };
    let end = tz
        .from_local_datetime(&end_date.and_time(entry.end_time))
        .latest()?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// 2025-03-10 is a Monday.
    fn monday_at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn entry(id: &str, start: NaiveTime, end: NaiveTime) -> ScheduleEntry {
        ScheduleEntry {
            id: ScheduleEntryId::new(id).unwrap(),
            user_id: UserId::new("lecturer-1").unwrap(),
            course_name: format!("Course {id}"),
            day: ScheduleDay::Weekly(Weekday::Mon),
            start_time: start,
            end_time: end,
            location_type: LocationType::Onsite,
            online_platform: None,
            online_url: None,
        }
    }

    #[test]
    fn five_minutes_late_scores_ninety() {
        let entries = [entry("a", time(13, 0), time(17, 0))];
        let m = best_match(&entries, monday_at(13, 5), Tz::UTC, &MatcherConfig::default())
            .expect("should match");
        assert_eq!(m.variance_minutes, 5);
        assert_eq!(m.confidence.value(), 90);
        assert!(m.is_match);
    }

    #[test]
    fn in_progress_entry_matches_despite_low_confidence() {
        let entries = [entry("a", time(13, 0), time(17, 0))];
        let m = best_match(&entries, monday_at(14, 0), Tz::UTC, &MatcherConfig::default())
            .expect("should match inside the window");
        assert_eq!(m.variance_minutes, 60);
        assert_eq!(m.confidence, Confidence::MIN);
        assert!(m.is_match);
    }

    #[test]
    fn early_arrival_inside_grace_is_negative_variance() {
        let entries = [entry("a", time(13, 0), time(17, 0))];
        let m = best_match(&entries, monday_at(12, 50), Tz::UTC, &MatcherConfig::default())
            .expect("inside the grace period");
        assert_eq!(m.variance_minutes, -10);
        assert_eq!(m.confidence.value(), 80);
    }

    #[test]
    fn outside_window_yields_nothing() {
        let entries = [entry("a", time(13, 0), time(17, 0))];
        let config = MatcherConfig::default();
        assert!(best_match(&entries, monday_at(12, 44), Tz::UTC, &config).is_none());
        assert!(best_match(&entries, monday_at(17, 1), Tz::UTC, &config).is_none());
        // Tuesday, same time
        let tuesday = Utc.with_ymd_and_hms(2025, 3, 11, 13, 5, 0).unwrap();
        assert!(best_match(&entries, tuesday, Tz::UTC, &config).is_none());
    }

    #[test]
    fn wide_grace_is_gated_by_threshold() {
        let config = MatcherConfig {
            grace_minutes: 30,
            ..MatcherConfig::default()
        };
        let entries = [entry("a", time(13, 0), time(17, 0))];
        let candidates = evaluate(&entries, monday_at(12, 35), Tz::UTC, &config);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].confidence.value(), 50);
        assert!(!candidates[0].is_match);
        assert!(best_match(&entries, monday_at(12, 35), Tz::UTC, &config).is_none());
    }

    #[test]
    fn ranking_prefers_confidence_then_variance_then_start() {
        let entries = [
            entry("long", time(8, 0), time(17, 0)),
            entry("near", time(13, 0), time(14, 0)),
        ];
        let candidates = evaluate(&entries, monday_at(13, 2), Tz::UTC, &MatcherConfig::default());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].schedule_entry_id.as_str(), "near");

        // Equal confidence: 12:55 is -5 from "b", +5 from "a"; both 90
        let tied = [
            entry("b", time(13, 0), time(14, 0)),
            entry("a", time(12, 50), time(14, 0)),
        ];
        let candidates = evaluate(&tied, monday_at(12, 55), Tz::UTC, &MatcherConfig::default());
        assert_eq!(candidates[0].confidence, candidates[1].confidence);
        assert_eq!(candidates[0].schedule_entry_id.as_str(), "a");
    }

    #[test]
    fn local_timezone_is_respected() {
        // 13:05 in Jakarta (UTC+7) is 06:05 UTC
        let entries = [entry("a", time(13, 0), time(17, 0))];
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 6, 5, 0).unwrap();
        let m = best_match(&entries, now, chrono_tz::Asia::Jakarta, &MatcherConfig::default())
            .expect("should match in local time");
        assert_eq!(m.variance_minutes, 5);
        assert!(best_match(&entries, now, Tz::UTC, &MatcherConfig::default()).is_none());
    }

    #[test]
    fn dated_entry_matches_only_on_its_date() {
        let mut once = entry("once", time(9, 0), time(10, 0));
        once.day = ScheduleDay::Date(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        let config = MatcherConfig::default();
        let wednesday = Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap();
        assert!(best_match(std::slice::from_ref(&once), wednesday, Tz::UTC, &config).is_some());
        let next_week = Utc.with_ymd_and_hms(2025, 3, 19, 9, 0, 0).unwrap();
        assert!(best_match(&[once], next_week, Tz::UTC, &config).is_none());
    }

    #[test]
    fn overnight_slot_spans_midnight() {
        let night = entry("night", time(22, 0), time(2, 0));
        // Tuesday 01:00 belongs to Monday's 22:00-02:00 slot
        let now = Utc.with_ymd_and_hms(2025, 3, 11, 1, 0, 0).unwrap();
        let m = best_match(&[night], now, Tz::UTC, &MatcherConfig::default())
            .expect("overnight slot should match");
        assert_eq!(m.variance_minutes, 180);
    }

    #[test]
    fn hybrid_counts_as_online() {
        let mut e = entry("a", time(13, 0), time(17, 0));
        e.location_type = LocationType::Hybrid;
        e.online_platform = Some("zoom".into());
        let m = best_match(&[e], monday_at(13, 0), Tz::UTC, &MatcherConfig::default()).unwrap();
        assert!(m.is_online());
        assert_eq!(m.online_platform.as_deref(), Some("zoom"));
    }
}
