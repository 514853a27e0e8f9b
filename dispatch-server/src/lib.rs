pub mod commands;
pub mod config;
pub mod pages;
pub mod render;
pub mod routes;
pub mod state;

use config::Settings;
use dispatch_core::geocode::ReverseGeocoder;
use dispatch_core::model::{AmbulanceStatus, GeoPoint, IncidentType, Severity};
use dispatch_core::places::PlaceResolver;
use dispatch_core::session::{NewAmbulance, NewIncident, Session};
use state::{AppState, SessionStore};
use std::sync::Arc;

/// Pre-populates a fresh session so the dashboard has something to show.
pub fn seed_demo_session(session: &mut Session) {
    session.register_ambulance(NewAmbulance {
        driver_name: "Amina Otieno".into(),
        plate_number: "KDA 101A".into(),
        status: AmbulanceStatus::Available,
        location: GeoPoint::new(1.2864, 36.8172),
    });
    session.register_ambulance(NewAmbulance {
        driver_name: "Brian Kamau".into(),
        plate_number: "KDB 202B".into(),
        status: AmbulanceStatus::Available,
        location: GeoPoint::new(1.3001, 36.7850),
    });
    session.report_incident(NewIncident {
        incident_type: IncidentType::Accident,
        severity: Severity::High,
        location: GeoPoint::new(1.2921, 36.8219),
    });
}

pub fn build_state(
    settings: &Settings,
    geocoder: Arc<dyn ReverseGeocoder>,
    demo: bool,
) -> Arc<AppState> {
    let seed: Option<fn(&mut Session)> = demo.then_some(seed_demo_session as fn(&mut Session));
    Arc::new(AppState {
        sessions: SessionStore::new(seed, settings.session_limits()),
        places: Arc::new(PlaceResolver::new(geocoder, settings.cache_policy())),
        map: settings.map(),
    })
}
