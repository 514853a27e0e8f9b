use dispatch_core::model::{AmbulanceStatus, GeoPoint, IncidentType, ParseChoiceError, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("⚠️ Please select a location on the map.")]
    MissingLocation,
    #[error("⚠️ Unsupported {field} '{value}'.")]
    InvalidChoice { field: &'static str, value: String },
    #[error("⚠️ Please select an {0}.")]
    MissingSelection(&'static str),
}

impl From<ParseChoiceError> for FormError {
    fn from(err: ParseChoiceError) -> Self {
        FormError::InvalidChoice {
            field: err.kind,
            value: err.value,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegisterAmbulanceForm {
    #[serde(default)]
    pub driver_name: String,
    #[serde(default)]
    pub plate_number: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lng: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReportIncidentForm {
    #[serde(default = "default_incident_type")]
    pub incident_type: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lng: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DispatchForm {
    #[serde(default)]
    pub ambulance_id: Option<String>,
    #[serde(default)]
    pub incident_id: Option<String>,
}

/// Registration that passed validation. Names and plates are taken as typed.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidRegistration {
    pub driver_name: String,
    pub plate_number: String,
    pub status: AmbulanceStatus,
    pub location: GeoPoint,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidIncidentReport {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub location: GeoPoint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidDispatch {
    pub ambulance_id: String,
    pub incident_id: String,
}

fn default_status() -> String {
    AmbulanceStatus::ALL[0].label().into()
}

fn default_incident_type() -> String {
    IncidentType::ALL[0].label().into()
}

fn default_severity() -> String {
    Severity::ALL[0].label().into()
}

pub fn validate_registration(form: &RegisterAmbulanceForm) -> Result<ValidRegistration, FormError> {
    let location = picked_point(form.lat.as_deref(), form.lng.as_deref())?;
    Ok(ValidRegistration {
        driver_name: form.driver_name.clone(),
        plate_number: form.plate_number.clone(),
        status: form.status.parse()?,
        location,
    })
}

pub fn validate_incident_report(
    form: &ReportIncidentForm,
) -> Result<ValidIncidentReport, FormError> {
    let location = picked_point(form.lat.as_deref(), form.lng.as_deref())?;
    Ok(ValidIncidentReport {
        incident_type: form.incident_type.parse()?,
        severity: form.severity.parse()?,
        location,
    })
}

pub fn validate_dispatch(form: &DispatchForm) -> Result<ValidDispatch, FormError> {
    let ambulance_id = selection(form.ambulance_id.as_deref())
        .ok_or(FormError::MissingSelection("ambulance"))?;
    let incident_id = selection(form.incident_id.as_deref())
        .ok_or(FormError::MissingSelection("incident"))?;
    Ok(ValidDispatch {
        ambulance_id,
        incident_id,
    })
}

/// Both coordinates must be present and finite, with latitude inside
/// [-90, 90]; anything else counts as "nothing clicked yet". Longitudes from
/// a map panned past the antimeridian are wrapped back into [-180, 180].
pub fn picked_point(lat: Option<&str>, lng: Option<&str>) -> Result<GeoPoint, FormError> {
    let parse = |raw: Option<&str>| {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };
    match (parse(lat), parse(lng)) {
        (Some(lat), Some(lng)) if (-90.0..=90.0).contains(&lat) => {
            Ok(GeoPoint::new(lat, wrap_longitude(lng)))
        }
        _ => Err(FormError::MissingLocation),
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

fn selection(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
