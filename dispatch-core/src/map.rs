use crate::model::{format_time, Ambulance, AmbulanceStatus, GeoPoint, Incident};
use crate::places::PlaceResolver;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 1.2921,
    lng: 36.8219,
};
pub const PICKER_ZOOM: u8 = 10;
pub const OVERVIEW_ZOOM: u8 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Green,
    Orange,
    Red,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerLayer {
    Ambulances,
    Incidents,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub layer: MarkerLayer,
    pub position: GeoPoint,
    pub popup: String,
    pub color: MarkerColor,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    pub markers: Vec<Marker>,
}

pub fn status_color(status: AmbulanceStatus) -> MarkerColor {
    match status {
        AmbulanceStatus::Available => MarkerColor::Green,
        AmbulanceStatus::Busy => MarkerColor::Orange,
    }
}

pub fn ambulance_marker(ambulance: &Ambulance, place: &str) -> Marker {
    Marker {
        layer: MarkerLayer::Ambulances,
        position: ambulance.location,
        popup: format!(
            "Ambulance: {} | Plate: {} | {} | {}",
            ambulance.driver_name, ambulance.plate_number, ambulance.status, place
        ),
        color: status_color(ambulance.status),
        icon: "ambulance".into(),
    }
}

pub fn incident_marker(incident: &Incident, place: &str) -> Marker {
    Marker {
        layer: MarkerLayer::Incidents,
        position: incident.location,
        popup: format!(
            "Incident: {} | {} | {} | {}",
            incident.incident_type,
            incident.severity,
            format_time(&incident.reported_at),
            place
        ),
        color: MarkerColor::Red,
        icon: "info-sign".into(),
    }
}

/// Ambulance layer first, then incidents, each in registration order.
pub async fn build_map_view(
    ambulances: &[Ambulance],
    incidents: &[Incident],
    places: &PlaceResolver,
    center: GeoPoint,
    zoom: u8,
) -> MapView {
    let mut markers = Vec::with_capacity(ambulances.len() + incidents.len());
    for ambulance in ambulances {
        let place = places.resolve(ambulance.location).await;
        markers.push(ambulance_marker(ambulance, &place));
    }
    for incident in incidents {
        let place = places.resolve(incident.location).await;
        markers.push(incident_marker(incident, &place));
    }
    MapView {
        center,
        zoom,
        markers,
    }
}
