//! Engine error types.

use att_core::{LocationId, SessionError, SessionId, StateError, ValidationError};
use thiserror::Error;

/// Failure to obtain or accept a position fix.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    /// No fix could be obtained in time.
    #[error("location unavailable: {reason}")]
    Unavailable { reason: String },

    /// The device refused to share its position.
    #[error("location permission denied")]
    PermissionDenied,

    /// The fix lies outside every allowed geofence.
    #[error("outside the allowed area ({distance_meters:.0} m from {location_id})")]
    OutOfBounds {
        location_id: LocationId,
        distance_meters: f64,
    },
}

/// Umbrella error for orchestrator operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("work location not found: {0}")]
    LocationNotFound(LocationId),

    /// The persistence backend failed.
    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(err))
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(err) => Self::Validation(err),
            SessionError::State(err) => Self::State(err),
        }
    }
}
