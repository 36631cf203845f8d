//! Error taxonomy for session operations.
//!
//! Validation and state errors are returned synchronously and are never
//! retried: the caller has to correct its input. Schedule lookups have no
//! error type on purpose, a failed lookup is simply "no match".

use thiserror::Error;

use crate::session::{SessionState, Transition};
use crate::types::{SessionId, UserId};

/// A request was missing a field its entry type or work mode requires, or
/// carried a value outside its domain.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Onsite check-in without a work location and without a schedule bypass.
    #[error("onsite check-in requires a work location")]
    LocationRequired,

    /// Teaching sessions must name the course being taught.
    #[error("teaching sessions require a course name")]
    MissingCourseName,

    /// Online sessions must name the platform they run on.
    #[error("online sessions require a platform")]
    MissingPlatform,

    /// Latitude or longitude is non-finite or out of range.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Geofence radius must be finite and positive.
    #[error("radius must be a positive number of meters, got {value}")]
    InvalidRadius { value: f64 },

    /// Meal break duration outside the accepted range.
    #[error("meal break must last {min}-{max} minutes, got {value}")]
    InvalidMealBreak { value: u32, min: u32, max: u32 },

    /// Attendance counts that cannot produce a rate.
    #[error("invalid attendance counts: {actual} of {expected} expected")]
    InvalidAttendance { actual: u32, expected: u32 },

    /// The confidence value was out of range.
    #[error("confidence must be between 0 and 100, got {value}")]
    ConfidenceOutOfRange { value: i64 },

    /// An enum string did not name a known variant.
    #[error("invalid {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },
}

/// A transition was requested that the session lifecycle does not allow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The user already has an open session.
    #[error("user {user_id} already has an open session ({session_id})")]
    AlreadyActive {
        user_id: UserId,
        session_id: SessionId,
    },

    /// The session is not in a state that accepts this transition.
    #[error("cannot {action} a session that is {state}")]
    InvalidTransition {
        action: Transition,
        state: SessionState,
    },
}

/// Umbrella error for state machine operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
}
