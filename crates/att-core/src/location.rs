//! Work locations and the users registered to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geo::{self, Coordinate};
use crate::types::{LocationId, OrgId, RegistrationSource, UserId};

/// An admin-defined circular geofence owned by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLocation {
    pub id: LocationId,
    pub org_id: OrgId,
    pub name: String,
    pub coordinate: Coordinate,
    pub radius_meters: f64,
}

impl WorkLocation {
    /// Creates a work location after validating its geometry.
    pub fn new(
        id: LocationId,
        org_id: OrgId,
        name: impl Into<String>,
        coordinate: Coordinate,
        radius_meters: f64,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "location name",
            });
        }
        coordinate.validate()?;
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(ValidationError::InvalidRadius {
                value: radius_meters,
            });
        }
        Ok(Self {
            id,
            org_id,
            name,
            coordinate,
            radius_meters,
        })
    }

    /// Distance in meters from the location's center.
    pub fn distance_from(&self, coordinate: Coordinate) -> Result<f64, ValidationError> {
        geo::distance(self.coordinate, coordinate)
    }

    /// Whether `distance` falls inside the geofence widened by `tolerance`.
    #[must_use]
    pub fn contains_distance(&self, distance: f64, tolerance: f64) -> bool {
        distance <= self.radius_meters + tolerance
    }
}

/// Link between a user and a work location they may check in at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRegistration {
    pub user_id: UserId,
    pub location_id: LocationId,
    /// Set by admin verification or by proximity auto-registration.
    pub verified: bool,
    pub registered_at: DateTime<Utc>,
    pub source: RegistrationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LocationRegistration {
    /// A verified registration created because the user was detected nearby.
    pub fn auto_detected(
        user_id: UserId,
        location_id: LocationId,
        distance: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            location_id,
            verified: true,
            registered_at: now,
            source: RegistrationSource::Auto,
            notes: Some(format!("auto-registered at {distance:.0} m")),
        }
    }

    /// An unverified registration requested by the user.
    pub const fn manual(
        user_id: UserId,
        location_id: LocationId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            location_id,
            verified: false,
            registered_at: now,
            source: RegistrationSource::Manual,
            notes,
        }
    }
}
