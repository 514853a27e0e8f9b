//! Server-side HTML. Leaflet is loaded from a CDN and drives both the point
//! picker on the forms and the overview map.

use crate::commands::{
    AmbulanceDto, Choice, DispatchDto, DispatchView, IncidentDto, Listing, Notice, NoticeKind,
};
use crate::pages::Page;
use crate::state::MapSettings;
use dispatch_core::map::MapView;
use dispatch_core::model::{AmbulanceStatus, IncidentType, Severity};
use std::fmt::Write;

const STYLE: &str = r#"
  body { margin: 0; display: flex; font-family: system-ui, sans-serif; color: #1f2933; }
  aside { width: 260px; min-height: 100vh; padding: 2rem 1.5rem; background: #f0f2f6; box-sizing: border-box; }
  .sidebar-title { font-size: 24px; font-weight: 700; color: black; margin-bottom: 2rem; }
  nav { display: flex; flex-direction: column; gap: 28px; }
  nav a { color: inherit; text-decoration: none; padding: 4px 8px; border-radius: 6px; }
  nav a:hover { background-color: rgba(255,255,255,0.15); cursor: pointer; }
  nav a.active { font-weight: 700; background: #ffffff; }
  aside hr { border-color: blue; margin-top: 3rem; }
  main { flex: 1; padding: 2rem 3rem; }
  .columns { display: flex; gap: 2rem; flex-wrap: wrap; }
  .columns > div { flex: 1; min-width: 280px; }
  label { display: block; margin: 0.75rem 0 0.25rem; }
  input[type=text], select { width: 100%; padding: 6px; }
  .map { height: 400px; width: 100%; max-width: 700px; }
  #overview-map { height: 500px; max-width: 900px; }
  .notice { padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 0; }
  .notice.success { background: #dff5e3; }
  .notice.info { background: #e1effe; }
  .notice.warning { background: #fff4d6; }
  .notice.error { background: #fde2e1; }
  .record { border-bottom: 1px solid #d0d5dd; padding: 0.75rem 0; }
  details { margin-top: 2rem; }
"#;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// JSON that is safe to inline inside a `<script>` element.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".into())
        .replace("</", "<\\/")
}

pub fn notice(notice: &Notice) -> String {
    let class = match notice.kind {
        NoticeKind::Success => "success",
        NoticeKind::Info => "info",
        NoticeKind::Warning => "warning",
        NoticeKind::Error => "error",
    };
    format!(
        r#"<div class="notice {class}" role="status">{}</div>"#,
        escape(&notice.text)
    )
}

pub fn layout(page: Page, content: &str, log: &[DispatchDto]) -> String {
    let mut nav = String::new();
    for entry in Page::ALL {
        let class = if entry == page { " class=\"active\"" } else { "" };
        let _ = write!(
            nav,
            r#"<a href="{}"{class}>{}</a>"#,
            entry.path(),
            escape(entry.label())
        );
    }

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Ambulance Dispatch Dashboard</title>
  <link rel="stylesheet" href="{LEAFLET_CSS}" crossorigin="" />
  <script src="{LEAFLET_JS}" crossorigin=""></script>
  <style>{STYLE}</style>
</head>
<body>
  <aside>
    <div class="sidebar-title">🚑 Dispatch System</div>
    <nav>{nav}</nav>
    <hr />
  </aside>
  <main>
    <h1>{title}</h1>
    {content}
    {log}
  </main>
</body>
</html>
"#,
        title = escape(page.title()),
        log = dispatch_log(log),
    )
}

pub fn dispatch_log(log: &[DispatchDto]) -> String {
    if log.is_empty() {
        return String::new();
    }
    let mut rows = String::new();
    for d in log {
        let _ = write!(
            rows,
            "<li>🕒 {} | 🚑 {} | ✅ {}</li>",
            escape(&d.dispatched_at),
            escape(&d.plate_number),
            escape(&d.status)
        );
    }
    format!(r#"<details class="dispatch-log"><summary>📜 Dispatch Log</summary><ul>{rows}</ul></details>"#)
}

fn select(name: &str, label: &str, choices: &[Choice]) -> String {
    let mut options = String::new();
    for c in choices {
        let _ = write!(
            options,
            r#"<option value="{}">{}</option>"#,
            escape(&c.value),
            escape(&c.label)
        );
    }
    format!(r#"<label for="{name}">{label}</label><select id="{name}" name="{name}">{options}</select>"#)
}

fn fixed_choices(labels: impl IntoIterator<Item = &'static str>) -> Vec<Choice> {
    labels
        .into_iter()
        .map(|label| Choice {
            value: label.to_string(),
            label: label.to_string(),
        })
        .collect()
}

/// Point-selection control. Clicking the map writes the point into the
/// form's hidden `lat`/`lng` inputs; submitting without a click leaves them
/// empty.
pub fn map_picker(prompt: &str, map: MapSettings) -> String {
    format!(
        r#"<h3>{prompt}</h3>
<div id="picker" class="map"></div>
<p class="picked" id="picked">No location selected.</p>
<input type="hidden" name="lat" id="lat" value="" />
<input type="hidden" name="lng" id="lng" value="" />
<script>
  (function () {{
    const map = L.map('picker').setView([{lat}, {lng}], {zoom});
    L.tileLayer('{TILE_URL}', {{ maxZoom: 19, attribution: '&copy; OpenStreetMap' }}).addTo(map);
    let marker = null;
    map.on('click', function (e) {{
      document.getElementById('lat').value = e.latlng.lat;
      document.getElementById('lng').value = e.latlng.lng;
      document.getElementById('picked').textContent =
        'Selected: ' + e.latlng.lat.toFixed(5) + ', ' + e.latlng.lng.toFixed(5);
      if (marker) {{ marker.setLatLng(e.latlng); }} else {{ marker = L.marker(e.latlng).addTo(map); }}
    }});
  }})();
</script>"#,
        prompt = escape(prompt),
        lat = map.center.lat,
        lng = map.center.lng,
        zoom = map.picker_zoom,
    )
}

pub fn register_form(map: MapSettings, outcome: Option<&Notice>) -> String {
    let statuses = fixed_choices(AmbulanceStatus::ALL.iter().map(|s| s.label()));
    format!(
        r#"<form method="post" action="{action}" id="register_form">
  <div class="columns">
    <div>
      <label for="driver_name">Driver Name</label><input type="text" id="driver_name" name="driver_name" />
      <label for="plate_number">Plate Number</label><input type="text" id="plate_number" name="plate_number" />
      {status}
    </div>
    <div>{picker}</div>
  </div>
  <button type="submit">Register Ambulance</button>
</form>
{outcome}"#,
        action = Page::RegisterAmbulance.path(),
        status = select("status", "Status", &statuses),
        picker = map_picker("Choose Ambulance Location", map),
        outcome = outcome.map(notice).unwrap_or_default(),
    )
}

pub fn incident_form(map: MapSettings, outcome: Option<&Notice>) -> String {
    let kinds = fixed_choices(IncidentType::ALL.iter().map(|t| t.label()));
    let severities = fixed_choices(Severity::ALL.iter().map(|s| s.label()));
    format!(
        r#"<form method="post" action="{action}" id="incident_form">
  <div class="columns">
    <div>
      {kind}
      {severity}
    </div>
    <div>{picker}</div>
  </div>
  <button type="submit">Report Incident</button>
</form>
{outcome}"#,
        action = Page::ReportIncident.path(),
        kind = select("incident_type", "Incident Type", &kinds),
        severity = select("severity", "Severity", &severities),
        picker = map_picker("Choose Incident Location", map),
        outcome = outcome.map(notice).unwrap_or_default(),
    )
}

pub fn ambulance_list(listing: &Listing<AmbulanceDto>) -> String {
    match listing {
        Listing::Empty(placeholder) => notice(placeholder),
        Listing::Rows(rows) => rows
            .iter()
            .map(|a| {
                format!(
                    r#"<article class="record">
  <div><b>Driver:</b> {}</div>
  <div><b>Plate:</b> <code>{}</code></div>
  <div><b>Status:</b> {}</div>
  <div><b>Location:</b> {}</div>
</article>"#,
                    escape(&a.driver_name),
                    escape(&a.plate_number),
                    escape(&a.status),
                    escape(&a.place)
                )
            })
            .collect(),
    }
}

pub fn incident_list(listing: &Listing<IncidentDto>) -> String {
    match listing {
        Listing::Empty(placeholder) => notice(placeholder),
        Listing::Rows(rows) => rows
            .iter()
            .map(|i| {
                format!(
                    r#"<article class="record">
  <div><b>Type:</b> {}</div>
  <div><b>Severity:</b> {}</div>
  <div><b>Reported At:</b> {}</div>
  <div><b>Location:</b> {}</div>
</article>"#,
                    escape(&i.incident_type),
                    escape(&i.severity),
                    escape(&i.reported_at),
                    escape(&i.place)
                )
            })
            .collect(),
    }
}

/// The outcome of the last submission is shown first so a successful
/// dispatch stays visible even when it used up the last available ambulance.
pub fn dispatch_panel(view: &DispatchView, outcome: Option<&Notice>) -> String {
    let outcome = outcome.map(notice).unwrap_or_default();
    match view {
        DispatchView::Unavailable(reason) => format!("{outcome}{}", notice(reason)),
        DispatchView::Ready {
            ambulances,
            incidents,
        } => format!(
            r#"{outcome}<form method="post" action="{action}" id="dispatch_form">
  {ambulances}
  {incidents}
  <button type="submit">Dispatch Now</button>
</form>"#,
            action = Page::DispatchAmbulance.path(),
            ambulances = select("ambulance_id", "Select Ambulance", ambulances),
            incidents = select("incident_id", "Select Incident", incidents),
        ),
    }
}

pub fn map_panel(view: &MapView) -> String {
    format!(
        r#"<div id="overview-map"></div>
<script>
  (function () {{
    const view = {data};
    const map = L.map('overview-map').setView([view.center.lat, view.center.lng], view.zoom);
    L.tileLayer('{TILE_URL}', {{ maxZoom: 19, attribution: '&copy; OpenStreetMap' }}).addTo(map);
    const layers = {{ ambulances: L.layerGroup().addTo(map), incidents: L.layerGroup().addTo(map) }};
    for (const m of view.markers) {{
      const popup = document.createElement('span');
      popup.textContent = m.popup;
      L.circleMarker([m.position.lat, m.position.lng], {{
        radius: 10, color: m.color, fillColor: m.color, fillOpacity: 0.85, className: 'icon-' + m.icon
      }}).bindPopup(popup).addTo(layers[m.layer]);
    }}
  }})();
</script>"#,
        data = script_json(view),
    )
}
