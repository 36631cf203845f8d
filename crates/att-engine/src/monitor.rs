//! Periodic geofence checks for open onsite sessions.
//!
//! Each monitored session owns one tokio task. The task re-reads the
//! position every interval and, on the first out-of-bounds reading, removes
//! its watch, invokes its callback once and exits. A shared `active` flag is cleared by whoever
//! finishes the watch first (the task on a violation, or [`LocationMonitor::stop`]),
//! so the callback can never run after a stop.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use att_core::{LocationId, SessionId, WorkLocation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::EngineConfig;
use crate::location::{LocationProvider, acquire, verify};

/// Why a watch ended with an out-of-bounds report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A reading placed the worker outside every allowed geofence.
    OutsideGeofence {
        nearest: Option<LocationId>,
        distance_meters: Option<f64>,
    },
    /// Too many consecutive readings failed.
    SignalLost { consecutive_failures: u32 },
}

/// Out-of-bounds report handed to the monitor callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub session_id: SessionId,
    pub detected_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::OutsideGeofence {
                nearest: Some(location),
                distance_meters: Some(distance),
            } => write!(
                f,
                "auto check-out: left the work area ({distance:.0} m from {location})"
            ),
            ViolationKind::OutsideGeofence { .. } => {
                f.write_str("auto check-out: left the work area")
            }
            ViolationKind::SignalLost {
                consecutive_failures,
            } => write!(
                f,
                "auto check-out: location lost after {consecutive_failures} failed readings"
            ),
        }
    }
}

/// Observability snapshot for one watch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub active: bool,
    pub checks: u64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_distance_meters: Option<f64>,
    pub consecutive_failures: u32,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
struct WatchSettings {
    interval: Duration,
    acquire_timeout: Duration,
    tolerance_meters: f64,
    missed_reading_limit: u32,
}

struct Watch {
    task: JoinHandle<()>,
    active: Arc<AtomicBool>,
    status: Arc<Mutex<MonitorStatus>>,
}

type Watches = Mutex<HashMap<SessionId, Watch>>;

/// Runs one watch task per monitored session.
pub struct LocationMonitor<P> {
    provider: Arc<P>,
    settings: WatchSettings,
    watches: Arc<Watches>,
}

impl<P: LocationProvider> LocationMonitor<P> {
    pub fn new(provider: Arc<P>, config: &EngineConfig) -> Self {
        Self {
            provider,
            settings: WatchSettings {
                interval: config.monitor_interval(),
                acquire_timeout: config.acquire_timeout(),
                tolerance_meters: config.geofence_tolerance_meters,
                missed_reading_limit: config.missed_reading_limit.max(1),
            },
            watches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts watching `session_id` against `locations`, replacing any
    /// existing watch for the session.
    ///
    /// Must be called from within a tokio runtime. The first check happens
    /// one interval from now.
    pub fn start<F>(&self, session_id: SessionId, locations: Vec<WorkLocation>, on_out_of_bounds: F)
    where
        F: FnOnce(Violation) + Send + 'static,
    {
        self.stop(&session_id);

        let active = Arc::new(AtomicBool::new(true));
        let status = Arc::new(Mutex::new(MonitorStatus {
            active: true,
            ..MonitorStatus::default()
        }));
        tracing::debug!(
            session = %session_id,
            locations = locations.len(),
            interval_secs = self.settings.interval.as_secs(),
            "starting location monitor"
        );
        // Hold the map while spawning so the task cannot finish before its
        // watch is registered.
        let mut watches = self.lock_watches();
        let task = tokio::spawn(run_watch(
            Arc::clone(&self.provider),
            self.settings.clone(),
            session_id.clone(),
            locations,
            WatchHandle {
                watches: Arc::downgrade(&self.watches),
                active: Arc::clone(&active),
                status: Arc::clone(&status),
            },
            on_out_of_bounds,
        ));
        watches.insert(
            session_id,
            Watch {
                task,
                active,
                status,
            },
        );
    }

    /// Stops the watch for `session_id`. Returns whether one existed.
    ///
    /// Idempotent, and takes effect immediately: a tick already in flight
    /// will not invoke the callback.
    pub fn stop(&self, session_id: &SessionId) -> bool {
        let Some(watch) = self.lock_watches().remove(session_id) else {
            return false;
        };
        watch.active.store(false, Ordering::SeqCst);
        watch.task.abort();
        tracing::debug!(session = %session_id, "stopped location monitor");
        true
    }

    /// Whether a watch is still checking `session_id`.
    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.lock_watches()
            .get(session_id)
            .is_some_and(|watch| watch.active.load(Ordering::SeqCst))
    }

    pub fn status(&self, session_id: &SessionId) -> Option<MonitorStatus> {
        let watches = self.lock_watches();
        let watch = watches.get(session_id)?;
        let mut status = watch
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        status.active = watch.active.load(Ordering::SeqCst);
        Some(status)
    }

    fn lock_watches(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Watch>> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> Drop for LocationMonitor<P> {
    fn drop(&mut self) {
        let mut watches = self.watches.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, watch) in watches.drain() {
            watch.active.store(false, Ordering::SeqCst);
            watch.task.abort();
        }
    }
}

/// The task's side of a [`Watch`].
struct WatchHandle {
    watches: Weak<Watches>,
    active: Arc<AtomicBool>,
    status: Arc<Mutex<MonitorStatus>>,
}

impl WatchHandle {
    /// Removes this watch from the monitor unless a restart replaced it.
    fn unregister(&self, session_id: &SessionId) {
        let Some(watches) = self.watches.upgrade() else {
            return;
        };
        let mut watches = watches.lock().unwrap_or_else(PoisonError::into_inner);
        if watches
            .get(session_id)
            .is_some_and(|watch| Arc::ptr_eq(&watch.active, &self.active))
        {
            watches.remove(session_id);
        }
    }
}

async fn run_watch<P, F>(
    provider: Arc<P>,
    settings: WatchSettings,
    session_id: SessionId,
    locations: Vec<WorkLocation>,
    handle: WatchHandle,
    on_out_of_bounds: F,
) where
    P: LocationProvider,
    F: FnOnce(Violation) + Send + 'static,
{
    let WatchHandle { active, status, .. } = &handle;
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; check-in has just verified.
    ticker.tick().await;

    let mut failures = 0_u32;
    let kind = loop {
        ticker.tick().await;
        if !active.load(Ordering::SeqCst) {
            return;
        }

        let reading = acquire(provider.as_ref(), settings.acquire_timeout).await;
        let now = Utc::now();
        let mut snapshot = status.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.checks += 1;
        snapshot.last_checked_at = Some(now);

        match reading {
            Ok(coordinate) => {
                failures = 0;
                let check = verify(coordinate, &locations, settings.tolerance_meters);
                snapshot.consecutive_failures = 0;
                snapshot.last_distance_meters = check.distance_meters;
                if check.valid {
                    snapshot.warning = None;
                    continue;
                }
                snapshot.warning = Some("outside the allowed area".to_string());
                break ViolationKind::OutsideGeofence {
                    nearest: check.nearest,
                    distance_meters: check.distance_meters,
                };
            }
            Err(err) => {
                failures += 1;
                snapshot.consecutive_failures = failures;
                snapshot.warning = Some(format!(
                    "location reading failed ({failures}/{}): {err}",
                    settings.missed_reading_limit
                ));
                tracing::warn!(session = %session_id, failures, error = %err, "location reading failed");
                if failures < settings.missed_reading_limit {
                    continue;
                }
                break ViolationKind::SignalLost {
                    consecutive_failures: failures,
                };
            }
        }
    };

    // Lost the race against stop(): stay silent.
    if !active.swap(false, Ordering::SeqCst) {
        return;
    }
    handle.unregister(&session_id);
    let violation = Violation {
        session_id,
        detected_at: Utc::now(),
        kind,
    };
    tracing::warn!(session = %violation.session_id, reason = %violation, "geofence violation");
    on_out_of_bounds(violation);
}
