//! html pages served by the web layer
//!
//! templates are plain strings with `<!-- NAME -->` slots filled by
//! `str::replace`. everything that came from a user or the device is escaped
//! before it goes in.

use crate::view::{format_degrees, html_escape, DashboardView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Success(String),
}

impl Notice {
    fn render(&self) -> String {
        match self {
            Notice::Error(msg) => format!(r#"<div class="notice error">{}</div>"#, html_escape(msg)),
            Notice::Success(msg) => format!(r#"<div class="notice success">{}</div>"#, html_escape(msg)),
        }
    }
}

const STYLE: &str = r#"<style>
  body { font-family: system-ui, sans-serif; margin: 0; background: #f4f6f8; color: #1f2933; }
  main { max-width: 760px; margin: 2rem auto; padding: 0 1rem; }
  form, details { background: #fff; border-radius: 8px; padding: 1rem 1.25rem; margin: 1rem 0; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
  label { display: block; margin: .5rem 0 .25rem; font-weight: 600; }
  select, input { width: 100%; padding: .5rem; box-sizing: border-box; }
  button { margin-top: .75rem; padding: .5rem 1rem; cursor: pointer; }
  .notice { padding: .75rem 1rem; border-radius: 6px; margin: 1rem 0; }
  .error { background: #fde8e8; color: #9b1c1c; }
  .success { background: #def7ec; color: #03543f; }
  .info { background: #e1effe; color: #1e429f; }
  .layout { display: flex; min-height: 100vh; }
  aside { width: 220px; background: #1f2933; color: #fff; padding: 1.5rem 1rem; }
  aside button { width: 100%; }
  #map { height: 500px; width: 700px; max-width: 100%; border-radius: 8px; }
</style>"#;

const LOGIN_HTML: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title><!-- BRAND --> Waste Management Login</title>
  <!-- STYLE -->
</head>
<body>
<main>
  <h1>🔑 <!-- BRAND --> Waste Management Login</h1>
  <!-- NOTICE -->
  <form method="post" action="/login">
    <label for="section">Select Section</label>
    <select id="section" name="section"><!-- SECTIONS --></select>
    <label for="password">Password</label>
    <input id="password" name="password" type="password">
    <button type="submit">Login</button>
  </form>
  <details>
    <summary>Forgot Password</summary>
    <form method="post" action="/recover">
      <label for="recover-section">Select Section</label>
      <select id="recover-section" name="section"><!-- QUESTIONS --></select>
      <label for="answer">Answer</label>
      <input id="answer" name="answer" type="text">
      <button type="submit">Verify and Show Password</button>
    </form>
  </details>
</main>
</body>
</html>"#;

const DASHBOARD_HTML: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title><!-- BRAND --> Waste Management Dashboard</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <!-- STYLE -->
</head>
<body>
<div class="layout">
  <aside>
    <h2>Welcome, <!-- SECTION --> Section</h2>
    <form method="post" action="/logout"><button type="submit">Logout</button></form>
  </aside>
  <main>
    <h1>📡 <!-- BRAND --> Waste Management Dashboard - Live GPS Events</h1>
    <!-- BODY -->
  </main>
</div>
<script>setTimeout(function () { window.location.reload(); }, <!-- REFRESH_MS -->);</script>
</body>
</html>"#;

/// `brand` prefixes the page titles, e.g. "ECE Waste Management Login"
pub fn login_page(
    brand: &str,
    sections: &[String],
    questions: &[(String, String)],
    notice: Option<&Notice>,
) -> String {
    let options: String = sections
        .iter()
        .map(|s| format!(r#"<option value="{0}">{0}</option>"#, html_escape(s)))
        .collect();
    let question_options: String = questions
        .iter()
        .map(|(s, q)| format!(r#"<option value="{}">{} — {}</option>"#, html_escape(s), html_escape(s), html_escape(q)))
        .collect();

    LOGIN_HTML
        .replace("<!-- STYLE -->", STYLE)
        .replace("<!-- BRAND -->", &html_escape(brand))
        .replace("<!-- NOTICE -->", &notice.map(Notice::render).unwrap_or_default())
        .replace("<!-- SECTIONS -->", &options)
        .replace("<!-- QUESTIONS -->", &question_options)
}

pub fn dashboard_page(brand: &str, section: &str, view: &DashboardView, refresh_ms: u64, zoom: u8) -> String {
    let body = match view {
        DashboardView::AllClear => {
            r#"<div class="notice info">No active event — all clear ✅</div>"#.to_string()
        }
        DashboardView::Event { condition, lat, lon, color, popup } => {
            // serde_json gives us a safely quoted js string literal
            let popup_js = serde_json::to_string(popup).unwrap_or_else(|_| "\"\"".to_string());
            format!(
                r#"<h2>📍 Latest Event Coordinates</h2>
    <p>Condition: {condition}</p>
    <p>Latitude: {lat}</p>
    <p>Longitude: {lon}</p>
    <div id="map" data-color="{color}"></div>
    <script>
      var map = L.map('map').setView([{lat}, {lon}], {zoom});
      L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
        maxZoom: 20, attribution: '&copy; OpenStreetMap contributors'
      }}).addTo(map);
      L.circleMarker([{lat}, {lon}], {{ radius: 10, color: '{color}', fillColor: '{color}', fillOpacity: 0.8 }})
        .addTo(map)
        .bindPopup({popup_js})
        .openPopup();
    </script>"#,
                condition = html_escape(condition),
                lat = format_degrees(*lat),
                lon = format_degrees(*lon),
                zoom = zoom,
                color = color.as_str(),
                popup_js = popup_js,
            )
        }
    };

    DASHBOARD_HTML
        .replace("<!-- STYLE -->", STYLE)
        .replace("<!-- BRAND -->", &html_escape(brand))
        .replace("<!-- SECTION -->", &html_escape(section))
        .replace("<!-- BODY -->", &body)
        .replace("<!-- REFRESH_MS -->", &refresh_ms.to_string())
}
