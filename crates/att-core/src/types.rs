//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Creates a fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_string_id!(
    /// A validated user identifier, supplied by the caller's identity context.
    UserId, "user ID"
);

define_string_id!(
    /// A validated organization identifier.
    OrgId, "organization ID"
);

define_string_id!(
    /// A validated session identifier.
    SessionId, "session ID"
);

define_string_id!(
    /// A validated work location identifier.
    LocationId, "location ID"
);

define_string_id!(
    /// A validated schedule entry identifier.
    ScheduleEntryId, "schedule entry ID"
);

/// Generates a closed string enum with `as_str`, `Display` and `FromStr`.
///
/// The strings double as the database and serde representation, so they
/// must match the `snake_case` serde renaming.
macro_rules! define_string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$( Self::$variant ),+];

            /// String representation for storage and display.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    _ => Err($crate::error::ValidationError::UnknownVariant {
                        field: $field_name,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use define_string_enum;

define_string_enum!(
    /// What kind of work a session records.
    EntryType, "entry type" {
        Teaching => "teaching",
        Meeting => "meeting",
        Prep => "prep",
        Admin => "admin",
        Other => "other",
    }
);

define_string_enum!(
    /// Where the work is performed. Only `Onsite` is geofenced.
    WorkMode, "work location" {
        Onsite => "onsite",
        Remote => "remote",
        Online => "online",
    }
);

impl WorkMode {
    /// Whether sessions in this mode are subject to geofence validation.
    #[must_use]
    pub const fn is_geofenced(self) -> bool {
        matches!(self, Self::Onsite)
    }
}

define_string_enum!(
    /// How a scheduled course is delivered.
    LocationType, "location type" {
        Onsite => "onsite",
        Online => "online",
        Hybrid => "hybrid",
    }
);

define_string_enum!(
    /// How a location registration came to exist.
    RegistrationSource, "registration source" {
        /// Selected by the user.
        Manual => "manual",
        /// Created by proximity detection.
        Auto => "auto",
    }
);

define_string_enum!(
    /// Who closed a session.
    CheckOutSource, "check-out source" {
        /// The worker checked out.
        Manual => "manual",
        /// The engine closed the session after a geofence violation.
        Auto => "auto",
    }
);

define_string_enum!(
    /// Caller role from the identity context. Informational only.
    Role, "role" {
        Worker => "worker",
        Admin => "admin",
    }
);

/// Opaque identity supplied by the caller. No authentication happens here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub org_id: OrgId,
    pub role: Role,
}

impl Identity {
    /// Creates a worker identity.
    pub const fn worker(user_id: UserId, org_id: OrgId) -> Self {
        Self {
            user_id,
            org_id,
            role: Role::Worker,
        }
    }
}

/// A schedule confidence score in the range \[0, 100\].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Confidence(u8);

impl Confidence {
    /// The maximum confidence value.
    pub const MAX: Self = Self(100);

    /// The minimum confidence value.
    pub const MIN: Self = Self(0);

    /// Creates a new confidence value after validation.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ValidationError::ConfidenceOutOfRange { value })
    }

    /// Creates a confidence value, clamping to \[0, 100\].
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self(u8::try_from(value.clamp(0, 100)).unwrap_or(100))
    }

    /// Returns the inner value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for Confidence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        // Clamp on deserialization to be lenient with external data
        Ok(Self::clamped(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_empty_and_blank() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("   ").is_err());
        assert!(UserId::new("u-1").is_ok());
        assert_eq!(
            SessionId::new("").unwrap_err(),
            ValidationError::Empty {
                field: "session ID"
            }
        );
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn id_serde_rejects_empty() {
        let result: Result<LocationId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
        let parsed: LocationId = serde_json::from_str("\"loc-1\"").unwrap();
        assert_eq!(parsed.as_str(), "loc-1");
    }

    #[test]
    fn string_enums_parse_their_own_display() {
        for variant in EntryType::ALL {
            assert_eq!(variant.to_string().parse::<EntryType>().unwrap(), *variant);
        }
        for variant in WorkMode::ALL {
            assert_eq!(variant.to_string().parse::<WorkMode>().unwrap(), *variant);
        }
        for variant in LocationType::ALL {
            let json = serde_json::to_string(variant).unwrap();
            assert_eq!(json, format!("\"{}\"", variant.as_str()));
        }
    }

    #[test]
    fn unknown_enum_value_names_the_field() {
        let err = "hovercraft".parse::<WorkMode>().unwrap_err();
        assert_eq!(err.to_string(), "invalid work location: hovercraft");
    }

    #[test]
    fn only_onsite_is_geofenced() {
        assert!(WorkMode::Onsite.is_geofenced());
        assert!(!WorkMode::Remote.is_geofenced());
        assert!(!WorkMode::Online.is_geofenced());
    }

    #[test]
    fn confidence_validates_range() {
        assert!(Confidence::new(0).is_ok());
        assert!(Confidence::new(100).is_ok());
        assert!(Confidence::new(101).is_err());
        assert!(Confidence::new(-1).is_err());
    }

    #[test]
    fn confidence_clamped_handles_edge_cases() {
        assert_eq!(Confidence::clamped(-40).value(), 0);
        assert_eq!(Confidence::clamped(250).value(), 100);
        assert_eq!(Confidence::clamped(90).value(), 90);
    }

    #[test]
    fn confidence_serde_clamps_out_of_range() {
        let parsed: Confidence = serde_json::from_str("140").unwrap();
        assert_eq!(parsed, Confidence::MAX);
        assert_eq!(serde_json::to_string(&Confidence::clamped(70)).unwrap(), "70");
    }
}
