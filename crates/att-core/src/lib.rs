//! Core domain logic for field attendance sessions.
//!
//! This crate contains the fundamental types and logic for:
//! - Geofencing: great-circle distance and work location geometry
//! - Schedule matching: scoring "now" against a recurring schedule
//! - Session lifecycle: check-in, pause/resume, check-out and special cases
//! - Time accounting: worked minutes derived from persisted timestamps

pub mod accounting;
pub mod error;
pub mod geo;
pub mod location;
pub mod schedule;
pub mod session;
pub mod special_case;
pub mod store;
pub mod types;

pub use error::{SessionError, StateError, ValidationError};
pub use geo::Coordinate;
pub use location::{LocationRegistration, WorkLocation};
pub use schedule::{MatcherConfig, ScheduleDay, ScheduleEntry, ScheduleMatch};
pub use session::{CheckInRequest, SessionEntry, SessionState, Transition};
pub use special_case::{CaseEffect, CaseOutcome, CaseType, SpecialCase, SpecialCaseEvent};
pub use store::SessionStore;
pub use types::{
    CheckOutSource, Confidence, EntryType, Identity, LocationId, LocationType, OrgId,
    RegistrationSource, Role, ScheduleEntryId, SessionId, UserId, WorkMode,
};
