//! Persistence seam consumed by the engine.

use crate::location::{LocationRegistration, WorkLocation};
use crate::schedule::ScheduleEntry;
use crate::session::SessionEntry;
use crate::types::{LocationId, OrgId, SessionId, UserId};

/// Durable storage for sessions and their reference data.
///
/// Implementations are assumed strongly consistent per row. This trait
/// allows the engine to work with different backends (e.g., `Database` from
/// att-db, or test fixtures).
pub trait SessionStore: Send {
    /// Backend-specific error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persists a newly opened session.
    fn create_session(&mut self, session: &SessionEntry) -> Result<(), Self::Error>;

    /// Persists a transition of an open session. Log entries are appended,
    /// never rewritten.
    ///
    /// Returns `false` without writing anything if the stored session has
    /// already been closed, e.g. by another process.
    fn update_session(&mut self, session: &SessionEntry) -> Result<bool, Self::Error>;

    /// Persists the final state of a closed session. Returns `false` without
    /// writing if the stored session was already closed.
    fn close_session(&mut self, session: &SessionEntry) -> Result<bool, Self::Error>;

    fn get_session(&self, id: &SessionId) -> Result<Option<SessionEntry>, Self::Error>;

    /// The user's open session, if any.
    fn open_session(&self, user_id: &UserId) -> Result<Option<SessionEntry>, Self::Error>;

    /// All of the user's sessions, most recent check-in first.
    fn list_sessions(&self, user_id: &UserId) -> Result<Vec<SessionEntry>, Self::Error>;

    /// Stores a registration; an existing (user, location) pair is left as is.
    fn create_location_registration(
        &mut self,
        registration: &LocationRegistration,
    ) -> Result<(), Self::Error>;

    fn list_location_registrations(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LocationRegistration>, Self::Error>;

    fn list_work_locations(&self, org_id: &OrgId) -> Result<Vec<WorkLocation>, Self::Error>;

    fn get_work_location(&self, id: &LocationId) -> Result<Option<WorkLocation>, Self::Error>;

    fn list_schedule_entries(&self, user_id: &UserId) -> Result<Vec<ScheduleEntry>, Self::Error>;
}
