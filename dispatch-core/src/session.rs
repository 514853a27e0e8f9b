//! In-memory bookkeeping for one dashboard session.
//!
//! A [`Session`] owns the three collections (ambulances, incidents,
//! dispatches). Nothing is ever deleted; the only mutation after creation is
//! an ambulance going from `Available` to `Busy` when it is dispatched.

use crate::model::{
    Ambulance, AmbulanceId, AmbulanceStatus, Dispatch, DispatchId, DispatchStatus, GeoPoint,
    Incident, IncidentId, IncidentType, Severity,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No available ambulances.")]
    NoAvailableAmbulances,
    #[error("No incidents to dispatch.")]
    NoIncidents,
    #[error("Ambulance {0} is not registered.")]
    UnknownAmbulance(AmbulanceId),
    #[error("Ambulance {plate_number} is already busy.")]
    AmbulanceBusy { plate_number: String },
    #[error("Incident {0} is not on record.")]
    UnknownIncident(IncidentId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAmbulance {
    pub driver_name: String,
    pub plate_number: String,
    pub status: AmbulanceStatus,
    pub location: GeoPoint,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewIncident {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub location: GeoPoint,
}

/// What the dispatch page may offer right now.
#[derive(Debug, PartialEq)]
pub enum DispatchBoard<'a> {
    Unavailable(DispatchError),
    Ready {
        ambulances: Vec<&'a Ambulance>,
        incidents: &'a [Incident],
    },
}

impl DispatchBoard<'_> {
    pub fn is_ready(&self) -> bool {
        matches!(self, DispatchBoard::Ready { .. })
    }
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    ambulances: Vec<Ambulance>,
    incidents: Vec<Incident>,
    dispatches: Vec<Dispatch>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ambulances(&self) -> &[Ambulance] {
        &self.ambulances
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    pub fn available_ambulances(&self) -> impl Iterator<Item = &Ambulance> {
        self.ambulances
            .iter()
            .filter(|a| a.status == AmbulanceStatus::Available)
    }

    pub fn ambulance(&self, id: AmbulanceId) -> Option<&Ambulance> {
        self.ambulances.iter().find(|a| a.id == id)
    }

    pub fn incident(&self, id: IncidentId) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.id == id)
    }

    pub fn register_ambulance(&mut self, new: NewAmbulance) -> &Ambulance {
        let ambulance = Ambulance {
            id: AmbulanceId::new(),
            driver_name: new.driver_name,
            plate_number: new.plate_number,
            status: new.status,
            location: new.location,
        };
        info!(
            id = %ambulance.id,
            plate = %ambulance.plate_number,
            status = %ambulance.status,
            "ambulance registered"
        );
        self.ambulances.push(ambulance);
        &self.ambulances[self.ambulances.len() - 1]
    }

    pub fn report_incident(&mut self, new: NewIncident) -> &Incident {
        self.report_incident_at(new, Utc::now())
    }

    pub fn report_incident_at(
        &mut self,
        new: NewIncident,
        reported_at: DateTime<Utc>,
    ) -> &Incident {
        let incident = Incident {
            id: IncidentId::new(),
            incident_type: new.incident_type,
            severity: new.severity,
            location: new.location,
            reported_at,
        };
        info!(
            id = %incident.id,
            kind = %incident.incident_type,
            severity = %incident.severity,
            "incident reported"
        );
        self.incidents.push(incident);
        &self.incidents[self.incidents.len() - 1]
    }

    /// Available ambulances are checked before incidents, so an empty
    /// session reports the ambulance shortage first.
    pub fn dispatch_board(&self) -> DispatchBoard<'_> {
        let ambulances: Vec<&Ambulance> = self.available_ambulances().collect();
        if ambulances.is_empty() {
            return DispatchBoard::Unavailable(DispatchError::NoAvailableAmbulances);
        }
        if self.incidents.is_empty() {
            return DispatchBoard::Unavailable(DispatchError::NoIncidents);
        }
        DispatchBoard::Ready {
            ambulances,
            incidents: &self.incidents,
        }
    }

    pub fn dispatch(
        &mut self,
        ambulance_id: AmbulanceId,
        incident_id: IncidentId,
    ) -> Result<Dispatch, DispatchError> {
        self.dispatch_at(ambulance_id, incident_id, Utc::now())
    }

    pub fn dispatch_at(
        &mut self,
        ambulance_id: AmbulanceId,
        incident_id: IncidentId,
        dispatched_at: DateTime<Utc>,
    ) -> Result<Dispatch, DispatchError> {
        if let DispatchBoard::Unavailable(reason) = self.dispatch_board() {
            warn!(%reason, "dispatch refused");
            return Err(reason);
        }
        if self.incident(incident_id).is_none() {
            warn!(%incident_id, "dispatch refused: unknown incident");
            return Err(DispatchError::UnknownIncident(incident_id));
        }

        let ambulance = self
            .ambulances
            .iter_mut()
            .find(|a| a.id == ambulance_id)
            .ok_or(DispatchError::UnknownAmbulance(ambulance_id))?;
        if ambulance.status != AmbulanceStatus::Available {
            warn!(plate = %ambulance.plate_number, "dispatch refused: ambulance busy");
            return Err(DispatchError::AmbulanceBusy {
                plate_number: ambulance.plate_number.clone(),
            });
        }
        ambulance.status = AmbulanceStatus::Busy;

        let dispatch = Dispatch {
            id: DispatchId::new(),
            plate_number: ambulance.plate_number.clone(),
            incident_id,
            dispatched_at,
            status: DispatchStatus::Dispatched,
        };
        info!(
            id = %dispatch.id,
            plate = %dispatch.plate_number,
            %incident_id,
            "ambulance dispatched"
        );
        self.dispatches.push(dispatch.clone());
        Ok(dispatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ambulance(plate: &str, status: AmbulanceStatus) -> NewAmbulance {
        NewAmbulance {
            driver_name: format!("driver of {plate}"),
            plate_number: plate.into(),
            status,
            location: GeoPoint::new(1.2921, 36.8219),
        }
    }

    fn incident(incident_type: IncidentType, severity: Severity) -> NewIncident {
        NewIncident {
            incident_type,
            severity,
            location: GeoPoint::new(1.30, 36.80),
        }
    }

    #[test]
    fn register_appends_exactly_one_record() {
        let mut session = Session::new();
        let id = session
            .register_ambulance(ambulance("KDA 001", AmbulanceStatus::Available))
            .id;

        assert_eq!(session.ambulances().len(), 1);
        let stored = session.ambulance(id).expect("stored");
        assert_eq!(stored.driver_name, "driver of KDA 001");
        assert_eq!(stored.plate_number, "KDA 001");
        assert_eq!(stored.status, AmbulanceStatus::Available);
        assert_eq!(stored.location, GeoPoint::new(1.2921, 36.8219));
    }

    #[test]
    fn duplicate_plates_are_accepted() {
        let mut session = Session::new();
        session.register_ambulance(ambulance("DUP", AmbulanceStatus::Available));
        session.register_ambulance(ambulance("DUP", AmbulanceStatus::Busy));
        assert_eq!(session.ambulances().len(), 2);
        assert_ne!(session.ambulances()[0].id, session.ambulances()[1].id);
    }

    #[test]
    fn dispatch_by_id_picks_the_exact_ambulance_among_duplicate_plates() {
        let mut session = Session::new();
        let first = session
            .register_ambulance(ambulance("DUP 1", AmbulanceStatus::Available))
            .id;
        let second = session
            .register_ambulance(ambulance("DUP 1", AmbulanceStatus::Available))
            .id;
        let incident = session
            .report_incident(incident(IncidentType::Medical, Severity::High))
            .id;

        let dispatch = session.dispatch(second, incident).expect("dispatch second");

        assert_eq!(dispatch.plate_number, "DUP 1");
        assert_eq!(dispatch.incident_id, incident);
        assert_eq!(session.dispatches().len(), 1);
        assert_eq!(
            session.ambulance(first).map(|a| a.status),
            Some(AmbulanceStatus::Available)
        );
        assert_eq!(
            session.ambulance(second).map(|a| a.status),
            Some(AmbulanceStatus::Busy)
        );

        let board = session.dispatch_board();
        match board {
            DispatchBoard::Ready { ambulances, .. } => {
                assert_eq!(ambulances.len(), 1);
                assert_eq!(ambulances[0].id, first);
            }
            other => panic!("expected dispatch to stay available, got {other:?}"),
        }
    }

    #[test]
    fn board_requires_available_ambulance_first() {
        let mut session = Session::new();
        assert_eq!(
            session.dispatch_board(),
            DispatchBoard::Unavailable(DispatchError::NoAvailableAmbulances)
        );

        session.register_ambulance(ambulance("BUSY", AmbulanceStatus::Busy));
        session.report_incident(incident(IncidentType::Fire, Severity::High));
        assert_eq!(
            session.dispatch_board(),
            DispatchBoard::Unavailable(DispatchError::NoAvailableAmbulances)
        );
    }

    #[test]
    fn two_ambulances_without_incidents_is_not_ready() {
        let mut session = Session::new();
        session.register_ambulance(ambulance("A", AmbulanceStatus::Available));
        session.register_ambulance(ambulance("B", AmbulanceStatus::Available));

        let board = session.dispatch_board();
        assert!(!board.is_ready());
        assert_eq!(board, DispatchBoard::Unavailable(DispatchError::NoIncidents));
    }

    #[test]
    fn board_offers_only_available_ambulances() {
        let mut session = Session::new();
        session.register_ambulance(ambulance("FREE", AmbulanceStatus::Available));
        session.register_ambulance(ambulance("BUSY", AmbulanceStatus::Busy));
        session.report_incident(incident(IncidentType::Medical, Severity::Low));

        let DispatchBoard::Ready { ambulances, incidents } = session.dispatch_board() else {
            panic!("board should be ready");
        };
        assert_eq!(ambulances.len(), 1);
        assert_eq!(ambulances[0].plate_number, "FREE");
        assert_eq!(incidents.len(), 1);
    }

    #[test]
    fn dispatch_marks_busy_and_appends_one_record() {
        let mut session = Session::new();
        let amb = session
            .register_ambulance(ambulance("KDA 777", AmbulanceStatus::Available))
            .id;
        let inc = session
            .report_incident(incident(IncidentType::Accident, Severity::Medium))
            .id;

        let dispatch = session.dispatch(amb, inc).expect("dispatch");
        assert_eq!(dispatch.plate_number, "KDA 777");
        assert_eq!(dispatch.incident_id, inc);
        assert_eq!(dispatch.status, DispatchStatus::Dispatched);
        assert_eq!(session.dispatches().len(), 1);
        assert_eq!(session.dispatches()[0], dispatch);
        assert_eq!(
            session.ambulance(amb).map(|a| a.status),
            Some(AmbulanceStatus::Busy)
        );
    }

    #[test]
    fn busy_ambulance_cannot_be_dispatched_twice() {
        let mut session = Session::new();
        let first = session
            .register_ambulance(ambulance("ONE", AmbulanceStatus::Available))
            .id;
        session.register_ambulance(ambulance("TWO", AmbulanceStatus::Available));
        let inc = session
            .report_incident(incident(IncidentType::Other, Severity::Low))
            .id;

        session.dispatch(first, inc).expect("first dispatch");
        let err = session.dispatch(first, inc).expect_err("already busy");
        assert_eq!(
            err,
            DispatchError::AmbulanceBusy {
                plate_number: "ONE".into()
            }
        );
        assert_eq!(session.dispatches().len(), 1);
    }

    #[test]
    fn unknown_ids_change_nothing() {
        let mut session = Session::new();
        let amb = session
            .register_ambulance(ambulance("X", AmbulanceStatus::Available))
            .id;
        let inc = session
            .report_incident(incident(IncidentType::Fire, Severity::Low))
            .id;

        let stray = IncidentId::new();
        assert_eq!(
            session.dispatch(amb, stray),
            Err(DispatchError::UnknownIncident(stray))
        );
        let ghost = AmbulanceId::new();
        assert_eq!(
            session.dispatch(ghost, inc),
            Err(DispatchError::UnknownAmbulance(ghost))
        );
        assert!(session.dispatches().is_empty());
        assert_eq!(session.ambulances()[0].status, AmbulanceStatus::Available);
    }

    #[test]
    fn identical_incident_labels_stay_distinguishable() {
        let mut session = Session::new();
        let amb = session
            .register_ambulance(ambulance("Z", AmbulanceStatus::Available))
            .id;
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        session.report_incident_at(incident(IncidentType::Fire, Severity::High), at);
        let second = session
            .report_incident_at(incident(IncidentType::Fire, Severity::High), at)
            .id;
        assert_eq!(
            session.incidents()[0].display_label(),
            session.incidents()[1].display_label()
        );

        let dispatch = session.dispatch(amb, second).expect("dispatch");
        assert_eq!(dispatch.incident_id, second);
        assert_ne!(dispatch.incident_id, session.incidents()[0].id);
    }
}
