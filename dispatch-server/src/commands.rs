//! View handlers. Each takes the caller's session explicitly and returns a
//! plain view model; HTML lives in `render`.

use crate::state::AppState;
use dispatch_core::map::{build_map_view, MapView};
use dispatch_core::model::{format_time, Ambulance, AmbulanceId, Dispatch, Incident, IncidentId};
use dispatch_core::places::PlaceResolver;
use dispatch_core::session::{DispatchBoard, DispatchError, NewAmbulance, NewIncident, Session};
use dispatch_forms::{
    validate_dispatch, validate_incident_report, validate_registration, DispatchForm, FormError,
    RegisterAmbulanceForm, ReportIncidentForm,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

impl From<FormError> for Notice {
    fn from(err: FormError) -> Self {
        Notice::error(err.to_string())
    }
}

impl From<DispatchError> for Notice {
    fn from(err: DispatchError) -> Self {
        Notice::warning(err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceDto {
    pub id: String,
    pub driver_name: String,
    pub plate_number: String,
    pub status: String,
    pub lat: f64,
    pub lng: f64,
    pub place: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IncidentDto {
    pub id: String,
    pub incident_type: String,
    pub severity: String,
    pub reported_at: String,
    pub lat: f64,
    pub lng: f64,
    pub place: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchDto {
    pub id: String,
    pub plate_number: String,
    pub incident_id: String,
    pub dispatched_at: String,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Listing<T> {
    Empty(Notice),
    Rows(Vec<T>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchView {
    Unavailable(Notice),
    Ready {
        ambulances: Vec<Choice>,
        incidents: Vec<Choice>,
    },
}

impl DispatchView {
    pub fn offers_dispatch(&self) -> bool {
        matches!(self, DispatchView::Ready { .. })
    }
}

pub fn register_ambulance(
    session: &mut Session,
    form: &RegisterAmbulanceForm,
) -> Result<Notice, Notice> {
    let valid = validate_registration(form)
        .inspect_err(|e| warn!(error = %e, "registration rejected"))?;

    let ambulance = session.register_ambulance(NewAmbulance {
        driver_name: valid.driver_name,
        plate_number: valid.plate_number,
        status: valid.status,
        location: valid.location,
    });
    Ok(Notice::success(format!(
        "✅ Ambulance {} registered.",
        ambulance.plate_number
    )))
}

pub fn report_incident(
    session: &mut Session,
    form: &ReportIncidentForm,
) -> Result<Notice, Notice> {
    let valid = validate_incident_report(form)
        .inspect_err(|e| warn!(error = %e, "incident report rejected"))?;

    session.report_incident(NewIncident {
        incident_type: valid.incident_type,
        severity: valid.severity,
        location: valid.location,
    });
    Ok(Notice::success("✅ Incident reported."))
}

pub async fn list_ambulances(session: &Session, places: &PlaceResolver) -> Listing<AmbulanceDto> {
    if session.ambulances().is_empty() {
        return Listing::Empty(Notice::warning("No ambulances registered yet."));
    }
    let mut rows = Vec::with_capacity(session.ambulances().len());
    for ambulance in session.ambulances() {
        rows.push(ambulance_dto(ambulance, places).await);
    }
    Listing::Rows(rows)
}

pub async fn list_incidents(session: &Session, places: &PlaceResolver) -> Listing<IncidentDto> {
    if session.incidents().is_empty() {
        return Listing::Empty(Notice::info("No incidents reported yet."));
    }
    let mut rows = Vec::with_capacity(session.incidents().len());
    for incident in session.incidents() {
        rows.push(incident_dto(incident, places).await);
    }
    Listing::Rows(rows)
}

pub fn dispatch_view(session: &Session) -> DispatchView {
    match session.dispatch_board() {
        DispatchBoard::Unavailable(reason) => DispatchView::Unavailable(reason.into()),
        DispatchBoard::Ready {
            ambulances,
            incidents,
        } => DispatchView::Ready {
            ambulances: ambulances
                .into_iter()
                .map(|a| Choice {
                    value: a.id.to_string(),
                    label: a.plate_number.clone(),
                })
                .collect(),
            incidents: incidents
                .iter()
                .map(|i| Choice {
                    value: i.id.to_string(),
                    label: i.display_label(),
                })
                .collect(),
        },
    }
}

pub fn dispatch_ambulance(session: &mut Session, form: &DispatchForm) -> Result<Notice, Notice> {
    let valid = validate_dispatch(form)?;
    let ambulance_id: AmbulanceId = valid
        .ambulance_id
        .parse()
        .map_err(|_| Notice::warning("⚠️ The selected ambulance is no longer listed."))?;
    let incident_id: IncidentId = valid
        .incident_id
        .parse()
        .map_err(|_| Notice::warning("⚠️ The selected incident is no longer listed."))?;

    let dispatch = session.dispatch(ambulance_id, incident_id)?;
    Ok(Notice::success(format!(
        "🚑 Ambulance {} dispatched at {}.",
        dispatch.plate_number,
        format_time(&dispatch.dispatched_at)
    )))
}

pub async fn map_view(session: &Session, state: &AppState) -> MapView {
    build_map_view(
        session.ambulances(),
        session.incidents(),
        &state.places,
        state.map.center,
        state.map.overview_zoom,
    )
    .await
}

/// Newest last, matching the order dispatches were made.
pub fn dispatch_log(session: &Session) -> Vec<DispatchDto> {
    session.dispatches().iter().map(dispatch_dto).collect()
}

pub async fn ambulance_dto(ambulance: &Ambulance, places: &PlaceResolver) -> AmbulanceDto {
    AmbulanceDto {
        id: ambulance.id.to_string(),
        driver_name: ambulance.driver_name.clone(),
        plate_number: ambulance.plate_number.clone(),
        status: ambulance.status.to_string(),
        lat: ambulance.location.lat,
        lng: ambulance.location.lng,
        place: places.resolve(ambulance.location).await,
    }
}

pub async fn incident_dto(incident: &Incident, places: &PlaceResolver) -> IncidentDto {
    IncidentDto {
        id: incident.id.to_string(),
        incident_type: incident.incident_type.to_string(),
        severity: incident.severity.to_string(),
        reported_at: format_time(&incident.reported_at),
        lat: incident.location.lat,
        lng: incident.location.lng,
        place: places.resolve(incident.location).await,
    }
}

pub fn dispatch_dto(dispatch: &Dispatch) -> DispatchDto {
    DispatchDto {
        id: dispatch.id.to_string(),
        plate_number: dispatch.plate_number.clone(),
        incident_id: dispatch.incident_id.to_string(),
        dispatched_at: format_time(&dispatch.dispatched_at),
        status: dispatch.status.to_string(),
    }
}
