//! Position fixes and geofence verification.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use att_core::{Coordinate, LocationId, WorkLocation};
use serde::Serialize;

use crate::error::LocationError;

/// Source of device position fixes.
pub trait LocationProvider: Send + Sync + 'static {
    /// Returns the current position, or why it is not available.
    fn current_coordinate(&self) -> impl Future<Output = Result<Coordinate, LocationError>> + Send;
}

/// Obtains a fix, giving up after `timeout`.
pub async fn acquire<P: LocationProvider>(
    provider: &P,
    timeout: Duration,
) -> Result<Coordinate, LocationError> {
    let coordinate = tokio::time::timeout(timeout, provider.current_coordinate())
        .await
        .map_err(|_| LocationError::Unavailable {
            reason: format!("no fix within {}s", timeout.as_secs()),
        })??;
    coordinate
        .validate()
        .map_err(|err| LocationError::Unavailable {
            reason: err.to_string(),
        })?;
    Ok(coordinate)
}

/// Result of checking one fix against a set of geofences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceCheck {
    pub valid: bool,
    /// Location whose boundary is closest to the fix.
    pub nearest: Option<LocationId>,
    /// Distance from the nearest location's center, in meters.
    pub distance_meters: Option<f64>,
}

/// Checks `coordinate` against `locations`.
///
/// The fix is valid if it lies within `radius + tolerance` of any location.
/// Locations whose distance cannot be computed are skipped.
pub fn verify(coordinate: Coordinate, locations: &[WorkLocation], tolerance: f64) -> GeofenceCheck {
    let mut valid = false;
    let mut nearest: Option<(&WorkLocation, f64)> = None;

    for location in locations {
        let Ok(distance) = location.distance_from(coordinate) else {
            tracing::warn!(location = %location.id, "skipping location with invalid geometry");
            continue;
        };
        valid |= location.contains_distance(distance, tolerance);
        let edge = distance - location.radius_meters;
        if nearest.is_none_or(|(best, best_distance)| edge < best_distance - best.radius_meters) {
            nearest = Some((location, distance));
        }
    }

    GeofenceCheck {
        valid,
        nearest: nearest.map(|(location, _)| location.id.clone()),
        distance_meters: nearest.map(|(_, distance)| distance),
    }
}

/// A provider that reports whatever coordinate it was last given.
///
/// Clones share the reading, so a test can move the device while the
/// engine holds the provider.
#[derive(Debug, Clone, Default)]
pub struct FixedLocation {
    reading: Arc<Mutex<Option<Result<Coordinate, LocationError>>>>,
}

impl FixedLocation {
    /// A provider that always reports `coordinate`.
    pub fn new(coordinate: Coordinate) -> Self {
        let provider = Self::default();
        provider.set(coordinate);
        provider
    }

    /// A provider with no fix.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, coordinate: Coordinate) {
        self.set_reading(Ok(coordinate));
    }

    pub fn fail(&self, err: LocationError) {
        self.set_reading(Err(err));
    }

    fn set_reading(&self, reading: Result<Coordinate, LocationError>) {
        *self.reading.lock().unwrap_or_else(PoisonError::into_inner) = Some(reading);
    }
}

impl LocationProvider for FixedLocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        self.reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| {
                Err(LocationError::Unavailable {
                    reason: "no position reported".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use att_core::OrgId;
    use att_core::geo::offset_north;

    fn center() -> Coordinate {
        Coordinate::new(-6.2, 106.8).unwrap()
    }

    fn location(id: &str, coordinate: Coordinate, radius: f64) -> WorkLocation {
        WorkLocation::new(
            LocationId::new(id).unwrap(),
            OrgId::new("org").unwrap(),
            id,
            coordinate,
            radius,
        )
        .unwrap()
    }

    #[test]
    fn fix_at_center_is_valid_with_zero_distance() {
        let check = verify(center(), &[location("a", center(), 100.0)], 20.0);
        assert!(check.valid);
        assert_eq!(check.nearest.unwrap().as_str(), "a");
        assert!(check.distance_meters.unwrap() < 1e-6);
    }

    #[test]
    fn fix_beyond_radius_and_tolerance_is_invalid() {
        let fix = offset_north(center(), 150.0);
        let check = verify(fix, &[location("a", center(), 100.0)], 20.0);
        assert!(!check.valid);
        let distance = check.distance_meters.unwrap();
        assert!((distance - 150.0).abs() < 1.0, "distance was {distance}");
    }

    #[test]
    fn tolerance_extends_the_boundary() {
        let fix = offset_north(center(), 110.0);
        assert!(verify(fix, &[location("a", center(), 100.0)], 20.0).valid);
        assert!(!verify(fix, &[location("a", center(), 100.0)], 0.0).valid);
    }

    #[test]
    fn nearest_is_measured_to_the_boundary() {
        // 300 m from a large site (radius 280) is closer to its edge than
        // 100 m from a small one (radius 10).
        let fix = center();
        let small = location("small", offset_north(center(), 100.0), 10.0);
        let large = location("large", offset_north(center(), -300.0), 280.0);
        let check = verify(fix, &[small, large], 0.0);
        assert!(!check.valid);
        assert_eq!(check.nearest.unwrap().as_str(), "large");
    }

    #[test]
    fn no_locations_is_invalid() {
        let check = verify(center(), &[], 20.0);
        assert!(!check.valid);
        assert!(check.nearest.is_none());
    }

    #[tokio::test]
    async fn fixed_location_reports_latest_reading() {
        let provider = FixedLocation::unavailable();
        assert!(matches!(
            acquire(&provider, Duration::from_secs(1)).await,
            Err(LocationError::Unavailable { .. })
        ));
        provider.set(center());
        assert_eq!(
            acquire(&provider, Duration::from_secs(1)).await.unwrap(),
            center()
        );
        provider.fail(LocationError::PermissionDenied);
        assert_eq!(
            acquire(&provider, Duration::from_secs(1)).await,
            Err(LocationError::PermissionDenied)
        );
    }

    struct Hanging;

    impl LocationProvider for Hanging {
        async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_times_out_as_unavailable() {
        let err = acquire(&Hanging, Duration::from_secs(10)).await.unwrap_err();
        assert_eq!(
            err,
            LocationError::Unavailable {
                reason: "no fix within 10s".to_string()
            }
        );
    }

    #[tokio::test]
    async fn out_of_range_fix_is_rejected() {
        let provider = FixedLocation::default();
        provider.set(Coordinate {
            latitude: 95.0,
            longitude: 0.0,
        });
        assert!(matches!(
            acquire(&provider, Duration::from_secs(1)).await,
            Err(LocationError::Unavailable { .. })
        ));
    }
}
