//! Engine tuning knobs.

use std::time::Duration;

use att_core::MatcherConfig;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Runtime configuration for the orchestrator and its location monitor.
///
/// Durations are stored as whole seconds so the struct can be layered from
/// TOML and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between geofence checks of an open onsite session.
    /// Default: 30.
    pub monitor_interval_secs: u64,

    /// Upper bound on a single position fix, in seconds.
    /// Default: 10.
    pub acquire_timeout_secs: u64,

    /// Slack added to every geofence radius, in meters.
    /// Default: 20.
    pub geofence_tolerance_meters: f64,

    /// Slack added to the radius when auto-registering nearby locations.
    /// Default: 20.
    pub registration_buffer_meters: f64,

    /// Consecutive failed readings after which the worker is treated as
    /// having left the geofence.
    /// Default: 3.
    pub missed_reading_limit: u32,

    /// Schedule matching constants.
    pub matcher: MatcherConfig,

    /// Zone in which schedule wall-clock times are interpreted.
    #[serde(skip)]
    pub timezone: Tz,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monitor_interval_secs: 30,
            acquire_timeout_secs: 10,
            geofence_tolerance_meters: 20.0,
            registration_buffer_meters: 20.0,
            missed_reading_limit: 3,
            matcher: MatcherConfig::default(),
            timezone: Tz::UTC,
        }
    }
}

impl EngineConfig {
    /// Interval between monitor ticks, never shorter than one second.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.monitor_interval(), Duration::from_secs(30));
        assert_eq!(config.acquire_timeout(), Duration::from_secs(10));
        assert!((config.geofence_tolerance_meters - 20.0).abs() < f64::EPSILON);
        assert_eq!(config.missed_reading_limit, 3);
        assert_eq!(config.matcher.match_threshold, 70);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"monitor_interval_secs": 5, "matcher": {"grace_minutes": 30}}"#)
                .unwrap();
        assert_eq!(config.monitor_interval(), Duration::from_secs(5));
        assert_eq!(config.acquire_timeout(), Duration::from_secs(10));
        assert_eq!(config.matcher.grace_minutes, 30);
        assert_eq!(config.matcher.penalty_per_minute, 2);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = EngineConfig {
            monitor_interval_secs: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.monitor_interval(), Duration::from_secs(1));
    }
}
