//! Runtime layer for field attendance sessions.
//!
//! Wires the pure domain in `att-core` to a persistence backend and a
//! position source:
//! - [`location`]: the provider seam, bounded fix acquisition and geofence checks
//! - [`monitor`]: per-session geofence watches with auto check-out callbacks
//! - [`registry`]: user/location registrations and proximity auto-registration
//! - [`orchestrator`]: the async façade with per-user serialization

pub mod config;
pub mod error;
pub mod location;
pub mod monitor;
pub mod orchestrator;
pub mod registry;

pub use config::EngineConfig;
pub use error::{EngineError, LocationError};
pub use location::{FixedLocation, GeofenceCheck, LocationProvider, acquire, verify};
pub use monitor::{LocationMonitor, MonitorStatus, Violation, ViolationKind};
pub use orchestrator::{CheckInParams, CheckOutRequest, PauseRequest, SessionOrchestrator};
pub use registry::{LocationRegistry, NearestLocation};
