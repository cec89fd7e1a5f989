use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    codes::from_openweather_id,
    error::FetchError,
    http::{default_client, get_json},
    model::{Coordinates, CurrentConditions, DailyForecastEntry, WeatherReport},
    provider::FORECAST_DAYS,
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const SERVICE: &str = "OpenWeather";

/// Keyed backend backed by the free OpenWeather current and 5-day endpoints.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    language: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, language: String) -> Self {
        Self {
            api_key,
            language,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: default_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        coords: Coordinates,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        let request = self.http.get(url).query(&[
            ("lat", coords.latitude.to_string()),
            ("lon", coords.longitude.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "metric".to_string()),
            ("lang", self.language.clone()),
        ]);

        get_json(request, SERVICE).await
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    #[serde(default)]
    timezone: i64,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: Option<OwCity>,
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_weather(&self, coords: Coordinates) -> Result<WeatherReport, FetchError> {
        let current: OwCurrentResponse = self.get("weather", coords).await?;
        let forecast: OwForecastResponse = self.get("forecast", coords).await?;

        Ok(WeatherReport { current: current_conditions(current)?, daily: daily_entries(forecast)? })
    }
}

fn current_conditions(parsed: OwCurrentResponse) -> Result<CurrentConditions, FetchError> {
    let main = parsed.main.ok_or(FetchError::MissingSection { service: SERVICE, section: "main" })?;
    let wind = parsed.wind.ok_or(FetchError::MissingSection { service: SERVICE, section: "wind" })?;
    let code = parsed.weather.first().map(|w| from_openweather_id(w.id)).unwrap_or(-1);

    Ok(CurrentConditions {
        temperature_c: main.temp,
        weather_code: code,
        wind_speed_kmh: wind.speed * 3.6,
        observed_at: local_time(parsed.dt, parsed.timezone)?,
    })
}

/// Folds the 3-hourly list into per-day summaries in the location's local time.
fn daily_entries(parsed: OwForecastResponse) -> Result<Vec<DailyForecastEntry>, FetchError> {
    if parsed.list.is_empty() {
        return Err(FetchError::MissingSection { service: SERVICE, section: "list" });
    }
    let offset = parsed.city.map(|c| c.timezone).unwrap_or(0);

    struct Day {
        max: f64,
        min: f64,
        code: i32,
        noon_distance: u32,
    }

    let mut days: BTreeMap<NaiveDate, Day> = BTreeMap::new();
    for entry in parsed.list {
        let local = local_time(entry.dt, offset)?;
        let max = entry.main.temp_max.unwrap_or(entry.main.temp);
        let min = entry.main.temp_min.unwrap_or(entry.main.temp);
        let code = entry.weather.first().map(|w| from_openweather_id(w.id)).unwrap_or(-1);
        let noon_distance = local.hour().abs_diff(12);

        days.entry(local.date())
            .and_modify(|day| {
                day.max = day.max.max(max);
                day.min = day.min.min(min);
                if noon_distance < day.noon_distance {
                    day.code = code;
                    day.noon_distance = noon_distance;
                }
            })
            .or_insert(Day { max, min, code, noon_distance });
    }

    Ok(days
        .into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, day)| DailyForecastEntry {
            date,
            max_temp_c: day.max,
            min_temp_c: day.min,
            weather_code: day.code,
        })
        .collect())
}

fn local_time(ts: i64, offset_secs: i64) -> Result<NaiveDateTime, FetchError> {
    DateTime::from_timestamp(ts + offset_secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| FetchError::InvalidValue {
            service: SERVICE,
            field: "dt",
            value: ts.to_string(),
        })
}
