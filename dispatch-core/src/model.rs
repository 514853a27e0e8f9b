use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AmbulanceId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IncidentId(pub Uuid);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DispatchId(pub Uuid);

macro_rules! uuid_id {
    ($name:ident) => {
        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(AmbulanceId);
uuid_id!(IncidentId);
uuid_id!(DispatchId);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseChoiceError {
    pub kind: &'static str,
    pub value: String,
}

/// Enum with a fixed set of user-facing labels.
macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = ParseChoiceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(ParseChoiceError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbulanceStatus {
    Available,
    Busy,
}

labelled_enum!(AmbulanceStatus, "ambulance status", {
    Available => "Available",
    Busy => "Busy",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentType {
    Accident,
    Medical,
    Fire,
    Other,
}

labelled_enum!(IncidentType, "incident type", {
    Accident => "Accident",
    Medical => "Medical",
    Fire => "Fire",
    Other => "Other",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

labelled_enum!(Severity, "severity", {
    Low => "Low",
    Medium => "Medium",
    High => "High",
});

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ambulance {
    pub id: AmbulanceId,
    pub driver_name: String,
    pub plate_number: String,
    pub status: AmbulanceStatus,
    pub location: GeoPoint,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub location: GeoPoint,
    pub reported_at: DateTime<Utc>,
}

impl Incident {
    /// Label shown in selection lists. Not unique; select by `id`.
    pub fn display_label(&self) -> String {
        format!(
            "{} | {} | {}",
            self.incident_type,
            self.severity,
            format_time(&self.reported_at)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    Dispatched,
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatched")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub id: DispatchId,
    pub plate_number: String,
    pub incident_id: IncidentId,
    pub dispatched_at: DateTime<Utc>,
    pub status: DispatchStatus,
}

pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format(DISPLAY_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn labels_round_trip_through_from_str() {
        for status in AmbulanceStatus::ALL {
            assert_eq!(status.label().parse::<AmbulanceStatus>(), Ok(*status));
        }
        let err = "Flood".parse::<IncidentType>().expect_err("not offered");
        assert_eq!(err.to_string(), "unknown incident type 'Flood'");
    }

    #[test]
    fn incident_label_uses_display_time() {
        let incident = Incident {
            id: IncidentId::new(),
            incident_type: IncidentType::Fire,
            severity: Severity::High,
            location: GeoPoint::new(1.0, 2.0),
            reported_at: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 5).unwrap(),
        };
        assert_eq!(incident.display_label(), "Fire | High | 2024-05-01 08:30:05");
    }

    #[test]
    fn ids_parse_from_their_display_form() {
        let id = AmbulanceId::new();
        assert_eq!(id.to_string().parse::<AmbulanceId>().expect("parse"), id);
        assert!("not-a-uuid".parse::<IncidentId>().is_err());
    }
}
