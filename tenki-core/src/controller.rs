//! Orchestrates location → weather → (reverse lookup) and owns the widget state.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    codes,
    geocode::GeocodingClient,
    location::{LocationProvider, TriggerState},
    messages,
    model::{Coordinates, DailyForecastEntry, PlaceLabel, SearchCandidate, UiStatus, WeatherReport},
    provider::WeatherProvider,
};

/// Number of forecast days shown, out of those fetched.
pub const FORECAST_DISPLAY_DAYS: usize = 2;

const WEEKDAYS_JA: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// Display-ready current conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentPanel {
    pub place: String,
    pub temperature: i64,
    pub description: String,
    pub wind_speed: i64,
    pub observed_at: String,
}

/// Display-ready forecast day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastPanelEntry {
    pub date: String,
    pub description: String,
    pub max_temp: i64,
    pub min_temp: i64,
}

/// Everything the user can see.
#[derive(Debug, Clone, Default)]
pub struct WidgetState {
    pub status: Option<UiStatus>,
    pub current: Option<CurrentPanel>,
    pub forecast: Vec<ForecastPanelEntry>,
    pub candidates: Vec<SearchCandidate>,
    pub sensor_succeeded: bool,
    pub sensor_in_flight: usize,
    /// Bumped whenever the weather panels are replaced.
    pub weather_revision: u64,
}

impl WidgetState {
    pub fn trigger(&self) -> TriggerState {
        if self.sensor_in_flight > 0 {
            TriggerState::Busy
        } else {
            TriggerState::Idle { has_succeeded: self.sensor_succeeded }
        }
    }

    pub fn weather_visible(&self) -> bool {
        self.current.is_some()
    }
}

/// Receives the state after every transition.
///
/// Called with the state lock held; implementations must not call back into
/// the controller.
pub trait View: Send + Sync {
    fn render(&self, state: &WidgetState);
}

/// Where the coordinates of a lookup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Sensor,
    Search,
}

struct Shared {
    state: Mutex<WidgetState>,
    view: Arc<dyn View>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut WidgetState)) {
        let mut state = self.state.lock();
        f(&mut state);
        self.view.render(&state);
    }
}

/// Releases the busy trigger on every exit path, including cancellation.
struct SensorBusyGuard {
    shared: Arc<Shared>,
}

impl SensorBusyGuard {
    fn engage(shared: &Arc<Shared>) -> Self {
        shared.update(|s| s.sensor_in_flight += 1);
        Self { shared: Arc::clone(shared) }
    }
}

impl Drop for SensorBusyGuard {
    fn drop(&mut self) {
        self.shared.update(|s| s.sensor_in_flight = s.sensor_in_flight.saturating_sub(1));
    }
}

/// Single owner of widget state, created once per session.
#[derive(Clone)]
pub struct PresentationController {
    weather: Arc<dyn WeatherProvider>,
    geocoder: GeocodingClient,
    location: LocationProvider,
    shared: Arc<Shared>,
    lookup_generation: Arc<AtomicU64>,
    search_generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for PresentationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationController")
            .field("weather", &self.weather)
            .field("lookup_generation", &self.lookup_generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl PresentationController {
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        geocoder: GeocodingClient,
        location: LocationProvider,
        view: Arc<dyn View>,
    ) -> Self {
        Self {
            weather,
            geocoder,
            location,
            shared: Arc::new(Shared { state: Mutex::new(WidgetState::default()), view }),
            lookup_generation: Arc::new(AtomicU64::new(0)),
            search_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WidgetState {
        self.shared.state.lock().clone()
    }

    pub fn trigger(&self) -> TriggerState {
        self.shared.state.lock().trigger()
    }

    /// Sensor path: acquire a position, then look up its weather.
    pub async fn locate(&self) {
        let _busy = SensorBusyGuard::engage(&self.shared);
        self.shared.update(|s| s.status = Some(UiStatus::info(messages::LOCATING)));

        match self.location.acquire().await {
            Ok(coords) => self.lookup(coords, None, Origin::Sensor).await,
            Err(err) => {
                tracing::warn!("Location sensor failed: {err}");
                let message = messages::location_failed(&err);
                self.shared.update(|s| s.status = Some(UiStatus::warning(message)));
            }
        }
    }

    /// Search path: replace the candidate list with matches for `query`.
    pub async fn search(&self, query: &str) {
        let ticket = self.search_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();

        if query.is_empty() {
            self.shared.update(|s| {
                s.candidates.clear();
                s.status = Some(UiStatus::warning(messages::EMPTY_QUERY));
            });
            return;
        }

        self.shared.update(|s| {
            s.candidates.clear();
            s.status = Some(UiStatus::info(messages::searching(query)));
        });

        let result = self.location.search(query).await;

        if self.search_generation.load(Ordering::SeqCst) != ticket {
            tracing::debug!(query, "Discarding superseded search result");
            return;
        }

        match result {
            Err(err) => {
                tracing::warn!(query, "Place search failed: {err}");
                self.shared.update(|s| s.status = Some(UiStatus::error(messages::SEARCH_FAILED)));
            }
            Ok(found) if found.is_empty() => {
                self.shared
                    .update(|s| s.status = Some(UiStatus::warning(messages::no_candidates(query))));
            }
            Ok(found) => {
                let message = messages::choose_candidate(found.len());
                self.shared.update(|s| {
                    s.candidates = found;
                    s.status = Some(UiStatus::info(message));
                });
            }
        }
    }

    /// Picks a candidate from the last search and looks up its weather.
    /// Returns `false` when there is no candidate at `index`.
    pub async fn select_candidate(&self, index: usize) -> bool {
        let picked = {
            let mut state = self.shared.state.lock();
            if index >= state.candidates.len() {
                return false;
            }
            let picked = state.candidates.swap_remove(index);
            state.candidates.clear();
            picked
        };

        self.lookup(picked.coordinates(), Some(picked.label()), Origin::Search).await;
        true
    }

    /// Fetches weather for `coords` and replaces the panels on success.
    pub async fn lookup(&self, coords: Coordinates, label: Option<PlaceLabel>, origin: Origin) {
        let ticket = self.lookup_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.update(|s| s.status = Some(UiStatus::info(messages::FETCHING_WEATHER)));

        let report = match self.weather.fetch_weather(coords).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(?coords, "Weather fetch failed: {err}");
                if self.is_current(ticket) {
                    let status = UiStatus::error(messages::WEATHER_FAILED);
                    self.shared.update(|s| s.status = Some(status));
                }
                return;
            }
        };

        let label = match label {
            Some(label) => label,
            None => self.geocoder.reverse_lookup(coords).await,
        };

        if !self.is_current(ticket) {
            tracing::debug!(?coords, "Discarding superseded weather result");
            if origin == Origin::Sensor {
                self.shared.update(|s| s.sensor_succeeded = true);
            }
            return;
        }

        let (current, forecast) = panels(&report, &label);
        tracing::info!(place = %label, "Showing weather");

        self.shared.update(|s| {
            s.current = Some(current);
            s.forecast = forecast;
            s.weather_revision += 1;
            s.status = Some(UiStatus::success(messages::SHOWING_LATEST));
            if origin == Origin::Sensor {
                s.sensor_succeeded = true;
            }
        });
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.lookup_generation.load(Ordering::SeqCst) == ticket
    }
}

fn panels(report: &WeatherReport, label: &PlaceLabel) -> (CurrentPanel, Vec<ForecastPanelEntry>) {
    let current = CurrentPanel {
        place: label.to_string(),
        temperature: round(report.current.temperature_c),
        description: codes::translate(report.current.weather_code).to_string(),
        wind_speed: round(report.current.wind_speed_kmh),
        observed_at: format_observed(report.current.observed_at),
    };

    let forecast = report.daily.iter().take(FORECAST_DISPLAY_DAYS).map(forecast_entry).collect();

    (current, forecast)
}

fn forecast_entry(day: &DailyForecastEntry) -> ForecastPanelEntry {
    ForecastPanelEntry {
        date: format_date(day.date),
        description: codes::translate(day.weather_code).to_string(),
        max_temp: round(day.max_temp_c),
        min_temp: round(day.min_temp_c),
    }
}

/// Rounds halves up, towards positive infinity.
fn round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn format_date(date: NaiveDate) -> String {
    let weekday = WEEKDAYS_JA[date.weekday().num_days_from_sunday() as usize];
    format!("{}月{}日({weekday})", date.month(), date.day())
}

pub fn format_observed(at: NaiveDateTime) -> String {
    at.format("%Y/%m/%d %H:%M").to_string()
}
