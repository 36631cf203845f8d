//! Which work locations a user may check in at.

use std::cmp::Ordering;

use att_core::{
    Coordinate, LocationId, LocationRegistration, OrgId, SessionStore, UserId, WorkLocation,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::EngineError;

/// A registered location and how far a fix is from its center.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestLocation {
    pub location: WorkLocation,
    pub distance_meters: f64,
}

/// Registration lookups and proximity-based auto-registration.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    buffer_meters: f64,
}

impl LocationRegistry {
    pub const fn new(buffer_meters: f64) -> Self {
        Self { buffer_meters }
    }

    pub fn list_registered<S: SessionStore>(
        &self,
        store: &S,
        user_id: &UserId,
    ) -> Result<Vec<LocationRegistration>, S::Error> {
        store.list_location_registrations(user_id)
    }

    /// Registers the user to every organization location within
    /// `radius + buffer` of `coordinate` that they are not registered to yet.
    ///
    /// Returns the registrations created.
    pub fn auto_register_nearby<S: SessionStore>(
        &self,
        store: &mut S,
        user_id: &UserId,
        org_id: &OrgId,
        coordinate: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<Vec<LocationRegistration>, S::Error> {
        let registered: Vec<LocationId> = store
            .list_location_registrations(user_id)?
            .into_iter()
            .map(|registration| registration.location_id)
            .collect();

        let mut created = Vec::new();
        for location in store.list_work_locations(org_id)? {
            if registered.contains(&location.id) {
                continue;
            }
            let Ok(distance) = location.distance_from(coordinate) else {
                continue;
            };
            if !location.contains_distance(distance, self.buffer_meters) {
                continue;
            }
            let registration =
                LocationRegistration::auto_detected(user_id.clone(), location.id.clone(), distance, now);
            store.create_location_registration(&registration)?;
            tracing::info!(
                user = %user_id,
                location = %location.id,
                distance_meters = distance,
                "auto-registered nearby location"
            );
            created.push(registration);
        }
        Ok(created)
    }

    /// The closest registered location within `radius + buffer`.
    ///
    /// Ties on distance go to the most recent registration. Lookup failures
    /// are logged and treated as "none nearby".
    pub fn nearest_registered<S: SessionStore>(
        &self,
        store: &S,
        user_id: &UserId,
        coordinate: Coordinate,
    ) -> Option<NearestLocation> {
        let registrations = match store.list_location_registrations(user_id) {
            Ok(registrations) => registrations,
            Err(err) => {
                tracing::warn!(user = %user_id, error = %err, "failed to list registrations");
                return None;
            }
        };

        let mut best: Option<(NearestLocation, DateTime<Utc>)> = None;
        for registration in registrations {
            let location = match store.get_work_location(&registration.location_id) {
                Ok(Some(location)) => location,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(
                        location = %registration.location_id,
                        error = %err,
                        "failed to load registered location"
                    );
                    continue;
                }
            };
            let Ok(distance) = location.distance_from(coordinate) else {
                continue;
            };
            if !location.contains_distance(distance, self.buffer_meters) {
                continue;
            }
            let closer = best.as_ref().is_none_or(|(current, registered_at)| {
                match distance.total_cmp(&current.distance_meters) {
                    Ordering::Less => true,
                    Ordering::Equal => registration.registered_at > *registered_at,
                    Ordering::Greater => false,
                }
            });
            if closer {
                best = Some((
                    NearestLocation {
                        location,
                        distance_meters: distance,
                    },
                    registration.registered_at,
                ));
            }
        }
        best.map(|(nearest, _)| nearest)
    }

    /// Registers the user to a location on request. The registration stays
    /// unverified until an administrator confirms it.
    pub fn register_manual<S: SessionStore>(
        &self,
        store: &mut S,
        user_id: &UserId,
        location_id: &LocationId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<LocationRegistration, EngineError> {
        if store
            .get_work_location(location_id)
            .map_err(EngineError::store)?
            .is_none()
        {
            return Err(EngineError::LocationNotFound(location_id.clone()));
        }
        let registration =
            LocationRegistration::manual(user_id.clone(), location_id.clone(), notes, now);
        store
            .create_location_registration(&registration)
            .map_err(EngineError::store)?;
        // An existing registration wins; report what is stored.
        let stored = store
            .list_location_registrations(user_id)
            .map_err(EngineError::store)?
            .into_iter()
            .find(|existing| existing.location_id == *location_id)
            .unwrap_or(registration);
        Ok(stored)
    }
}
