use crate::commands::{self, Notice};
use crate::render;
use crate::state::AppState;
use dispatch_core::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    RegisterAmbulance,
    ReportIncident,
    ListAmbulances,
    ListIncidents,
    DispatchAmbulance,
    MapView,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::RegisterAmbulance,
        Page::ReportIncident,
        Page::ListAmbulances,
        Page::ListIncidents,
        Page::DispatchAmbulance,
        Page::MapView,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Page::RegisterAmbulance => "register-ambulance",
            Page::ReportIncident => "report-incident",
            Page::ListAmbulances => "ambulances",
            Page::ListIncidents => "incidents",
            Page::DispatchAmbulance => "dispatch",
            Page::MapView => "map",
        }
    }

    /// Sidebar entry.
    pub fn label(self) -> &'static str {
        match self {
            Page::RegisterAmbulance => "➕ Register Ambulance",
            Page::ReportIncident => "📍 Report Incident",
            Page::ListAmbulances => "🚑 View Ambulances",
            Page::ListIncidents => "📌 View Incidents",
            Page::DispatchAmbulance => "🚨 Dispatch Emergency",
            Page::MapView => "🗺️ Live Map",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::RegisterAmbulance => "➕ Register New Ambulance",
            Page::ReportIncident => "📍 Report New Incident",
            Page::ListAmbulances => "🚑 Registered Ambulances",
            Page::ListIncidents => "📌 Reported Incidents",
            Page::DispatchAmbulance => "🚨 Dispatch Ambulance",
            Page::MapView => "🗺️ Emergency Map View",
        }
    }

    /// Unknown slugs land on the first page, like a radio group that always
    /// has a selection.
    pub fn from_slug(slug: &str) -> Page {
        Page::ALL
            .into_iter()
            .find(|p| p.slug() == slug)
            .unwrap_or(Page::RegisterAmbulance)
    }

    pub fn path(self) -> String {
        format!("/{}", self.slug())
    }
}

/// Runs the page's view handler against the session and renders the full
/// document, sidebar and dispatch log included.
pub async fn render_page(
    state: &AppState,
    session: &Session,
    page: Page,
    notice: Option<Notice>,
) -> String {
    let content = match page {
        Page::RegisterAmbulance => render::register_form(state.map, notice.as_ref()),
        Page::ReportIncident => render::incident_form(state.map, notice.as_ref()),
        Page::ListAmbulances => {
            render::ambulance_list(&commands::list_ambulances(session, &state.places).await)
        }
        Page::ListIncidents => {
            render::incident_list(&commands::list_incidents(session, &state.places).await)
        }
        Page::DispatchAmbulance => {
            render::dispatch_panel(&commands::dispatch_view(session), notice.as_ref())
        }
        Page::MapView => render::map_panel(&commands::map_view(session, state).await),
    };
    render::layout(page, &content, &commands::dispatch_log(session))
}
