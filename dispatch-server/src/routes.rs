use crate::commands::{self, AmbulanceDto, DispatchDto, IncidentDto, Notice};
use crate::pages::{render_page, Page};
use crate::state::{AppState, SessionHandle};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use dispatch_core::map::MapView;
use dispatch_forms::{DispatchForm, RegisterAmbulanceForm, ReportIncidentForm};
use std::sync::Arc;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "dispatch_session";

pub fn dashboard_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/ambulances", get(api_ambulances))
        .route("/api/incidents", get(api_incidents))
        .route("/api/dispatches", get(api_dispatches))
        .route("/api/map", get(api_map))
        .route(
            "/register-ambulance",
            get(show_register).post(submit_register),
        )
        .route("/report-incident", get(show_report).post(submit_report))
        .route("/dispatch", get(show_dispatch).post(submit_dispatch))
        .route("/:page", get(show_page))
        .with_state(state)
}

async fn index() -> Redirect {
    Redirect::to(&Page::RegisterAmbulance.path())
}

async fn healthz() -> &'static str {
    "ok"
}

/// Session bound to the current request plus the cookie to hand back when
/// the session was just created.
struct SessionContext {
    handle: SessionHandle,
    set_cookie: Option<HeaderValue>,
}

fn session_for(state: &AppState, headers: &HeaderMap) -> SessionContext {
    let (id, handle, created) = state.sessions.get_or_create(session_cookie(headers));
    let set_cookie = created
        .then(|| {
            HeaderValue::from_str(&format!(
                "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
            ))
            .ok()
        })
        .flatten();
    SessionContext { handle, set_cookie }
}

/// Session for read-only API calls. An unknown or missing cookie reads an
/// unsaved session instead of starting one.
fn existing_session(state: &AppState, headers: &HeaderMap) -> SessionHandle {
    state
        .sessions
        .get(session_cookie(headers))
        .unwrap_or_else(|| state.sessions.detached())
}

pub fn session_cookie(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn with_cookie(ctx: &SessionContext, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if let Some(cookie) = ctx.set_cookie.clone() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

async fn page_response(
    state: &AppState,
    ctx: &SessionContext,
    page: Page,
    status: StatusCode,
    notice: Option<Notice>,
) -> Response {
    let session = ctx.handle.lock().await;
    let html = render_page(state, &session, page, notice).await;
    with_cookie(ctx, (status, Html(html)))
}

async fn show_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = session_for(&state, &headers);
    page_response(&state, &ctx, Page::from_slug(&slug), StatusCode::OK, None).await
}

async fn show_register(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = session_for(&state, &headers);
    page_response(&state, &ctx, Page::RegisterAmbulance, StatusCode::OK, None).await
}

async fn show_report(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = session_for(&state, &headers);
    page_response(&state, &ctx, Page::ReportIncident, StatusCode::OK, None).await
}

async fn show_dispatch(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let ctx = session_for(&state, &headers);
    page_response(&state, &ctx, Page::DispatchAmbulance, StatusCode::OK, None).await
}

async fn submit_register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<RegisterAmbulanceForm>,
) -> Response {
    let ctx = session_for(&state, &headers);
    let outcome = commands::register_ambulance(&mut *ctx.handle.lock().await, &form);
    let (status, notice) = split_outcome(outcome);
    page_response(&state, &ctx, Page::RegisterAmbulance, status, Some(notice)).await
}

async fn submit_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ReportIncidentForm>,
) -> Response {
    let ctx = session_for(&state, &headers);
    let outcome = commands::report_incident(&mut *ctx.handle.lock().await, &form);
    let (status, notice) = split_outcome(outcome);
    page_response(&state, &ctx, Page::ReportIncident, status, Some(notice)).await
}

async fn submit_dispatch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DispatchForm>,
) -> Response {
    let ctx = session_for(&state, &headers);
    let outcome = commands::dispatch_ambulance(&mut *ctx.handle.lock().await, &form);
    let (status, notice) = split_outcome(outcome);
    page_response(&state, &ctx, Page::DispatchAmbulance, status, Some(notice)).await
}

/// Rejected submissions re-render the same form with the warning and a 422.
fn split_outcome(outcome: Result<Notice, Notice>) -> (StatusCode, Notice) {
    match outcome {
        Ok(notice) => (StatusCode::OK, notice),
        Err(notice) => (StatusCode::UNPROCESSABLE_ENTITY, notice),
    }
}

async fn api_ambulances(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let handle = existing_session(&state, &headers);
    let session = handle.lock().await;
    let mut rows: Vec<AmbulanceDto> = Vec::with_capacity(session.ambulances().len());
    for ambulance in session.ambulances() {
        rows.push(commands::ambulance_dto(ambulance, &state.places).await);
    }
    Json(rows).into_response()
}

async fn api_incidents(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let handle = existing_session(&state, &headers);
    let session = handle.lock().await;
    let mut rows: Vec<IncidentDto> = Vec::with_capacity(session.incidents().len());
    for incident in session.incidents() {
        rows.push(commands::incident_dto(incident, &state.places).await);
    }
    Json(rows).into_response()
}

async fn api_dispatches(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let handle = existing_session(&state, &headers);
    let rows: Vec<DispatchDto> = commands::dispatch_log(&*handle.lock().await);
    Json(rows).into_response()
}

async fn api_map(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let handle = existing_session(&state, &headers);
    let view: MapView = commands::map_view(&*handle.lock().await, &state).await;
    Json(view).into_response()
}
