//! ==============================================================================
//! view.rs - dashboard snapshot
//! ==============================================================================
//!
//! purpose:
//!     turns the latest reading into what the dashboard shows: either an
//!     "all clear" state or a map marker with a colour and popup.
//!
//! colour rule:
//!     red if the lower-cased condition contains "tilt", "height" or "alert",
//!     green otherwise.
//!
//! ==============================================================================

use crate::domain::LatestReading;
use serde::Serialize;

const ALERT_KEYWORDS: [&str; 3] = ["tilt", "height", "alert"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Green,
}

impl MarkerColor {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Green => "green",
        }
    }
}

pub fn marker_color(condition: &str) -> MarkerColor {
    let condition = condition.to_lowercase();
    if ALERT_KEYWORDS.iter().any(|k| condition.contains(k)) {
        MarkerColor::Red
    } else {
        MarkerColor::Green
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    #[default]
    AllClear,
    Event {
        condition: String,
        lat: f64,
        lon: f64,
        color: MarkerColor,
        /// html fragment, condition already escaped
        popup: String,
    },
}

impl DashboardView {
    pub fn from_reading(reading: &LatestReading) -> Self {
        if !reading.is_complete() {
            return DashboardView::AllClear;
        }

        let (lat, lon) = match (parse_coordinate(&reading.lat), parse_coordinate(&reading.lon)) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                tracing::warn!(
                    "[VIEW] Unusable coordinates lat={:?} lon={:?}, showing all clear",
                    reading.lat,
                    reading.lon
                );
                return DashboardView::AllClear;
            }
        };

        DashboardView::Event {
            condition: reading.condition.clone(),
            lat,
            lon,
            color: marker_color(&reading.condition),
            popup: format!(
                "{}<br>Lat: {}<br>Lon: {}",
                html_escape(&reading.condition),
                format_degrees(lat),
                format_degrees(lon)
            ),
        }
    }
}

/// decimal degrees, whole numbers keep one decimal place ("12.0")
pub fn format_degrees(value: f64) -> String {
    format!("{:?}", value)
}

fn parse_coordinate(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// escape html special characters to prevent xss
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
