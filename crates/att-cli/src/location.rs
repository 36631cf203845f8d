//! Position source for the CLI.
//!
//! A fix comes from `--lat/--lon` when given, otherwise from the configured
//! location file, which is re-read on every reading so an external process
//! (GPS daemon, phone bridge) can keep it current.

use std::path::PathBuf;

use att_core::Coordinate;
use att_engine::{LocationError, LocationProvider};

#[derive(Debug, Clone, Default)]
pub struct DeviceLocation {
    fixed: Option<Coordinate>,
    file: Option<PathBuf>,
}

impl DeviceLocation {
    pub const fn new(fixed: Option<Coordinate>, file: Option<PathBuf>) -> Self {
        Self { fixed, file }
    }
}

impl LocationProvider for DeviceLocation {
    async fn current_coordinate(&self) -> Result<Coordinate, LocationError> {
        if let Some(coordinate) = self.fixed {
            return Ok(coordinate);
        }
        let Some(path) = &self.file else {
            return Err(LocationError::Unavailable {
                reason: "no position given (use --lat/--lon or set location_file)".to_string(),
            });
        };
        let contents = tokio::fs::read_to_string(path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::PermissionDenied {
                LocationError::PermissionDenied
            } else {
                LocationError::Unavailable {
                    reason: format!("cannot read {}: {err}", path.display()),
                }
            }
        })?;
        serde_json::from_str(&contents).map_err(|err| LocationError::Unavailable {
            reason: format!("invalid fix in {}: {err}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_coordinate_wins() {
        let coordinate = Coordinate::new(1.0, 2.0).unwrap();
        let provider = DeviceLocation::new(Some(coordinate), Some(PathBuf::from("/nonexistent")));
        assert_eq!(provider.current_coordinate().await.unwrap(), coordinate);
    }

    #[tokio::test]
    async fn file_is_reread_on_each_reading() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fix.json");
        let provider = DeviceLocation::new(None, Some(path.clone()));

        assert!(matches!(
            provider.current_coordinate().await,
            Err(LocationError::Unavailable { .. })
        ));

        std::fs::write(&path, r#"{"latitude": -6.2, "longitude": 106.8}"#).unwrap();
        assert_eq!(
            provider.current_coordinate().await.unwrap(),
            Coordinate::new(-6.2, 106.8).unwrap()
        );

        std::fs::write(&path, "not json").unwrap();
        assert!(provider.current_coordinate().await.is_err());
    }

    #[tokio::test]
    async fn nothing_configured_is_unavailable() {
        let err = DeviceLocation::default()
            .current_coordinate()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--lat/--lon"));
    }
}
