use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Separator used between the parts of a place label.
pub const LABEL_SEPARATOR: &str = "・";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Human-readable name of a location, e.g. "Paris・Ile-de-France・France".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceLabel(String);

impl PlaceLabel {
    /// Joins the non-empty parts; `admin1` is dropped when it repeats `name`.
    pub fn from_parts(name: &str, admin1: Option<&str>, country: Option<&str>) -> Self {
        let name = name.trim();
        let admin1 = admin1.map(str::trim).filter(|a| *a != name);
        let country = country.map(str::trim);

        let parts: Vec<&str> = [Some(name), admin1, country]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();

        Self(parts.join(LABEL_SEPARATOR))
    }

    /// Fallback label used when no place name is known.
    pub fn from_coordinates(coords: Coordinates) -> Self {
        Self(format!("lat {:.2}, lon {:.2}", coords.latitude, coords.longitude))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub weather_code: i32,
    pub wind_speed_kmh: f64,
    /// Observation time in the location's local timezone.
    pub observed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub weather_code: i32,
}

/// Everything a single weather fetch returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentConditions,
    pub daily: Vec<DailyForecastEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiStatus {
    pub message: String,
    pub severity: Severity,
}

impl UiStatus {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self { message: message.into(), severity }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }
}

/// One place returned by a forward geocoding query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub name: String,
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl SearchCandidate {
    pub fn label(&self) -> PlaceLabel {
        PlaceLabel::from_parts(&self.name, self.admin1.as_deref(), self.country.as_deref())
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
