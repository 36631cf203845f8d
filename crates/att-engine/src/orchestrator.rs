//! Session orchestration.
//!
//! [`SessionOrchestrator`] is the façade callers talk to. It combines the
//! state machine, schedule matching, location registry and monitor behind a
//! small async API.
//!
//! # Concurrency
//!
//! Every transition for a user runs under that user's `tokio::sync::Mutex`,
//! which is what keeps a user at one open session. The store sits behind a
//! `std::sync::Mutex` that is only ever held for synchronous store calls,
//! never across an `.await`.
//!
//! A monitor violation spawns a fresh task that checks the session out
//! through the normal path, so it takes the same user lock and re-checks
//! that the session is still open.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use att_core::schedule::{self, ScheduleMatch};
use att_core::special_case::BreakType;
use att_core::{
    CheckInRequest, CheckOutSource, Coordinate, EntryType, Identity, LocationId,
    LocationRegistration, ScheduleEntry, SessionEntry, SessionId, SessionState, SessionStore,
    SpecialCase, StateError, Transition, UserId, WorkLocation, WorkMode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

use crate::config::EngineConfig;
use crate::error::{EngineError, LocationError};
use crate::location::{LocationProvider, acquire, verify};
use crate::monitor::{LocationMonitor, MonitorStatus, Violation};
use crate::registry::LocationRegistry;

/// Caller-supplied check-in parameters.
///
/// Every field left unset may be filled from the schedule entry matching the
/// check-in time. Explicit values always win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInParams {
    pub entry_type: Option<EntryType>,
    pub work_mode: Option<WorkMode>,
    pub course_name: Option<String>,
    /// Work location the caller picked. Without one, onsite check-ins use the
    /// nearest registered location.
    pub location_id: Option<LocationId>,
    pub online_platform: Option<String>,
    pub online_url: Option<String>,
    pub expected_student_count: Option<u32>,
    pub notes: Option<String>,
    /// Skip schedule detection.
    #[serde(default)]
    pub ignore_schedule: bool,
}

/// Parameters for a plain pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRequest {
    #[serde(default)]
    pub reason: String,
    pub break_type: BreakType,
    /// Expected length of the break. Informational only.
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutRequest {
    pub source: CheckOutSource,
    pub notes: Option<String>,
}

impl CheckOutRequest {
    pub const fn manual(notes: Option<String>) -> Self {
        Self {
            source: CheckOutSource::Manual,
            notes,
        }
    }
}

struct Inner<S, P> {
    store: Mutex<S>,
    provider: Arc<P>,
    monitor: LocationMonitor<P>,
    registry: LocationRegistry,
    config: EngineConfig,
    user_locks: UserLocks,
}

type UserLocks = Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>;

/// Serializes one user's operations. On drop the user's entry leaves the
/// map once no other caller holds or awaits it.
struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.user_id);
        }
    }
}

/// Entry point for all session operations.
///
/// Cheap to clone; clones share the same store, locks and monitor.
pub struct SessionOrchestrator<S, P> {
    inner: Arc<Inner<S, P>>,
}

impl<S, P> Clone for SessionOrchestrator<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, P> SessionOrchestrator<S, P>
where
    S: SessionStore + 'static,
    P: LocationProvider,
{
    pub fn new(store: S, provider: P, config: EngineConfig) -> Self {
        let provider = Arc::new(provider);
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                monitor: LocationMonitor::new(Arc::clone(&provider), &config),
                provider,
                registry: LocationRegistry::new(config.registration_buffer_meters),
                config,
                user_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Opens a session for `identity`.
    ///
    /// Onsite check-ins need a position fix. A selected location must contain
    /// it; otherwise the nearest registered location is used (registering
    /// nearby locations first). An onsite schedule match admits a check-in
    /// with no location at all.
    ///
    /// The location monitor is started for onsite sessions bound to a
    /// location.
    pub async fn check_in(
        &self,
        identity: &Identity,
        params: CheckInParams,
        now: DateTime<Utc>,
    ) -> Result<SessionEntry, EngineError> {
        let user_id = &identity.user_id;
        let _guard = self.lock_user(user_id).await;

        if let Some(open) = self.with_store(|store| store.open_session(user_id))? {
            return Err(StateError::AlreadyActive {
                user_id: user_id.clone(),
                session_id: open.id,
            }
            .into());
        }

        let scheduled = if params.ignore_schedule {
            None
        } else {
            self.detect_schedule(user_id, now)
        };
        // Only an onsite schedule match excuses a missing work location.
        let schedule_bypass = scheduled.as_ref().is_some_and(|found| !found.is_online());
        let mut request = prefill(params, scheduled.as_ref());
        // Field checks first, so a bad request never waits on a fix.
        request.validate(true)?;

        let mut geofence = Vec::new();
        if request.work_mode.is_geofenced() {
            let coordinate =
                acquire(self.inner.provider.as_ref(), self.inner.config.acquire_timeout()).await?;

            if let Some(location_id) = &request.location_id {
                let location = self
                    .with_store(|store| store.get_work_location(location_id))?
                    .ok_or_else(|| EngineError::LocationNotFound(location_id.clone()))?;
                let check = verify(
                    coordinate,
                    std::slice::from_ref(&location),
                    self.inner.config.geofence_tolerance_meters,
                );
                if !check.valid {
                    return Err(LocationError::OutOfBounds {
                        location_id: location.id,
                        distance_meters: check.distance_meters.unwrap_or_default(),
                    }
                    .into());
                }
                geofence.push(location);
            } else if let Some(nearest) = self.resolve_nearby(identity, coordinate, now) {
                tracing::debug!(
                    user = %user_id,
                    location = %nearest.id,
                    "using nearest registered location"
                );
                request.location_id = Some(nearest.id.clone());
                geofence.push(nearest);
            }
        }

        let session = SessionEntry::check_in(identity, request, schedule_bypass, now)?;
        self.with_store(|store| store.create_session(&session))?;
        tracing::info!(
            session = %session.id,
            user = %user_id,
            entry_type = %session.entry_type,
            work_mode = %session.work_mode,
            scheduled = session.schedule_entry_id.is_some(),
            "checked in"
        );

        if !geofence.is_empty() {
            self.arm_monitor(&session, geofence);
        }
        Ok(session)
    }

    pub async fn pause(
        &self,
        session_id: &SessionId,
        request: PauseRequest,
        now: DateTime<Utc>,
    ) -> Result<SessionEntry, EngineError> {
        self.transition(session_id, Transition::Pause, |session| {
            session
                .pause(
                    &request.reason,
                    request.break_type,
                    request.duration_minutes,
                    now,
                )
                .map_err(EngineError::from)
        })
        .await
    }

    pub async fn resume(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<SessionEntry, EngineError> {
        self.transition(session_id, Transition::Resume, |session| {
            session.resume(now).map_err(EngineError::from)
        })
        .await
    }

    /// Closes the session and stops its monitor.
    pub async fn check_out(
        &self,
        session_id: &SessionId,
        request: CheckOutRequest,
        now: DateTime<Utc>,
    ) -> Result<SessionEntry, EngineError> {
        self.transition(session_id, Transition::CheckOut, |session| {
            session
                .check_out(request.source, request.notes, now)
                .map_err(EngineError::from)
        })
        .await
    }

    /// Logs a special case on the session and applies its effect.
    pub async fn report_special_case(
        &self,
        session_id: &SessionId,
        case: SpecialCase,
        now: DateTime<Utc>,
    ) -> Result<SessionEntry, EngineError> {
        self.transition(session_id, Transition::SpecialCase, |session| {
            let outcome = session.apply_special_case(&case, now)?;
            tracing::info!(
                session = %session.id,
                case_type = %case.case_type(),
                effect = ?outcome.effect,
                "{}",
                outcome.message
            );
            Ok(())
        })
        .await
    }

    /// Worked minutes of the session as of `now`.
    pub fn elapsed_minutes(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        Ok(self.session(session_id)?.elapsed_minutes(now))
    }

    /// The best schedule match for the user at `now`.
    ///
    /// Never fails: an unreadable schedule counts as no match.
    pub fn detect_schedule(&self, user_id: &UserId, now: DateTime<Utc>) -> Option<ScheduleMatch> {
        let config = &self.inner.config;
        let found = schedule::best_match(
            &self.schedule_entries(user_id),
            now,
            config.timezone,
            &config.matcher,
        );
        if let Some(found) = &found {
            tracing::debug!(
                user = %user_id,
                entry = %found.schedule_entry_id,
                confidence = found.confidence.value(),
                variance_minutes = found.variance_minutes,
                "schedule match"
            );
        }
        found
    }

    /// Every schedule entry whose window contains `now`, best first,
    /// including those below the match threshold.
    pub fn schedule_candidates(&self, user_id: &UserId, now: DateTime<Utc>) -> Vec<ScheduleMatch> {
        let config = &self.inner.config;
        schedule::evaluate(
            &self.schedule_entries(user_id),
            now,
            config.timezone,
            &config.matcher,
        )
    }

    /// Re-arms the monitor for the user's open onsite session, e.g. after a
    /// restart. Returns whether a monitor is now running.
    pub async fn resume_monitoring(&self, user_id: &UserId) -> Result<bool, EngineError> {
        let _guard = self.lock_user(user_id).await;
        let Some(session) = self.with_store(|store| store.open_session(user_id))? else {
            return Ok(false);
        };
        if !session.work_mode.is_geofenced() {
            return Ok(false);
        }
        let Some(location_id) = &session.location_id else {
            return Ok(false);
        };
        let Some(location) = self.with_store(|store| store.get_work_location(location_id))? else {
            tracing::warn!(
                session = %session.id,
                location = %location_id,
                "work location of open session no longer exists"
            );
            return Ok(false);
        };
        self.arm_monitor(&session, vec![location]);
        Ok(true)
    }

    pub fn monitor_status(&self, session_id: &SessionId) -> Option<MonitorStatus> {
        self.inner.monitor.status(session_id)
    }

    pub fn open_session(&self, user_id: &UserId) -> Result<Option<SessionEntry>, EngineError> {
        self.with_store(|store| store.open_session(user_id))
    }

    pub fn session(&self, session_id: &SessionId) -> Result<SessionEntry, EngineError> {
        self.with_store(|store| store.get_session(session_id))?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.clone()))
    }

    /// All of the user's sessions, most recent first.
    pub fn sessions(&self, user_id: &UserId) -> Result<Vec<SessionEntry>, EngineError> {
        self.with_store(|store| store.list_sessions(user_id))
    }

    pub fn registered_locations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LocationRegistration>, EngineError> {
        let store = self.lock_store();
        self.inner
            .registry
            .list_registered(&*store, user_id)
            .map_err(EngineError::store)
    }

    pub fn register_location(
        &self,
        user_id: &UserId,
        location_id: &LocationId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LocationRegistration, EngineError> {
        let mut store = self.lock_store();
        self.inner
            .registry
            .register_manual(&mut *store, user_id, location_id, notes, now)
    }

    async fn transition<F>(
        &self,
        session_id: &SessionId,
        action: Transition,
        apply: F,
    ) -> Result<SessionEntry, EngineError>
    where
        F: FnOnce(&mut SessionEntry) -> Result<(), EngineError> + Send,
    {
        let user_id = self.session(session_id)?.user_id;
        let _guard = self.lock_user(&user_id).await;

        // Re-read under the lock; the session may have moved on meanwhile.
        let mut session = self.session(session_id)?;
        apply(&mut session)?;

        // The store refuses to write over a row another process has closed.
        let written = if session.is_open() {
            self.with_store(|store| store.update_session(&session))?
        } else {
            self.with_store(|store| store.close_session(&session))?
        };
        if !written {
            self.inner.monitor.stop(&session.id);
            return Err(StateError::InvalidTransition {
                action,
                state: SessionState::Closed,
            }
            .into());
        }

        if !session.is_open() {
            self.inner.monitor.stop(&session.id);
            tracing::info!(
                session = %session.id,
                source = ?session.check_out_source,
                worked_minutes = session.elapsed_minutes(Utc::now()),
                "checked out"
            );
        }
        Ok(session)
    }

    fn resolve_nearby(
        &self,
        identity: &Identity,
        coordinate: Coordinate,
        now: DateTime<Utc>,
    ) -> Option<WorkLocation> {
        let registry = &self.inner.registry;
        let mut store = self.lock_store();
        if let Err(err) = registry.auto_register_nearby(
            &mut *store,
            &identity.user_id,
            &identity.org_id,
            coordinate,
            now,
        ) {
            tracing::warn!(user = %identity.user_id, error = %err, "auto-registration failed");
        }
        registry
            .nearest_registered(&*store, &identity.user_id, coordinate)
            .map(|nearest| nearest.location)
    }

    fn arm_monitor(&self, session: &SessionEntry, geofence: Vec<WorkLocation>) {
        let inner: Weak<Inner<S, P>> = Arc::downgrade(&self.inner);
        self.inner
            .monitor
            .start(session.id.clone(), geofence, move |violation| {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                let orchestrator = Self { inner };
                tokio::spawn(async move {
                    orchestrator.auto_check_out(violation).await;
                });
            });
    }

    async fn auto_check_out(&self, violation: Violation) {
        let request = CheckOutRequest {
            source: CheckOutSource::Auto,
            notes: Some(violation.to_string()),
        };
        match self
            .check_out(&violation.session_id, request, Utc::now())
            .await
        {
            Ok(_) => {}
            Err(EngineError::State(StateError::InvalidTransition { .. })) => {
                tracing::debug!(session = %violation.session_id, "session already closed");
            }
            Err(err) => {
                tracing::error!(session = %violation.session_id, error = %err, "auto check-out failed");
            }
        }
    }

    fn schedule_entries(&self, user_id: &UserId) -> Vec<ScheduleEntry> {
        self.with_store(|store| store.list_schedule_entries(user_id))
            .unwrap_or_else(|err| {
                tracing::warn!(user = %user_id, error = %err, "schedule unavailable");
                Vec::new()
            })
    }

    async fn lock_user(&self, user_id: &UserId) -> UserGuard<'_> {
        let locks = &self.inner.user_locks;
        let lock = {
            let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        UserGuard {
            locks,
            user_id: user_id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, S> {
        self.inner.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_store<T>(
        &self,
        op: impl FnOnce(&mut S) -> Result<T, S::Error>,
    ) -> Result<T, EngineError> {
        op(&mut *self.lock_store()).map_err(EngineError::store)
    }
}

/// Merges caller parameters with a schedule match. Explicit values win.
fn prefill(params: CheckInParams, scheduled: Option<&ScheduleMatch>) -> CheckInRequest {
    let scheduled_mode = scheduled.map(|found| {
        if found.is_online() {
            WorkMode::Online
        } else {
            WorkMode::Onsite
        }
    });
    let work_mode = params.work_mode.or(scheduled_mode).unwrap_or_default();

    let (online_platform, online_url) = if work_mode == WorkMode::Online {
        (
            params
                .online_platform
                .or_else(|| scheduled.and_then(|found| found.online_platform.clone())),
            params
                .online_url
                .or_else(|| scheduled.and_then(|found| found.online_url.clone())),
        )
    } else {
        (params.online_platform, params.online_url)
    };

    CheckInRequest {
        entry_type: params
            .entry_type
            .or(scheduled.map(|_| EntryType::Teaching))
            .unwrap_or_default(),
        work_mode,
        course_name: params
            .course_name
            .or_else(|| scheduled.map(|found| found.course_name.clone())),
        location_id: params.location_id,
        schedule_entry_id: scheduled.map(|found| found.schedule_entry_id.clone()),
        online_platform,
        online_url,
        expected_student_count: params.expected_student_count,
        notes: params.notes,
    }
}
