use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    http::{default_client, get_json},
    model::{Coordinates, CurrentConditions, DailyForecastEntry, WeatherReport},
    provider::FORECAST_DAYS,
};

use super::WeatherProvider;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

const SERVICE: &str = "Open-Meteo";
const DAILY_FIELDS: &str = "weathercode,temperature_2m_max,temperature_2m_min";

/// Keyless backend backed by the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_FORECAST_URL)
    }
}

impl OpenMeteoProvider {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: default_client() }
    }
}

#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
    time: String,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    weathercode: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    current_weather: Option<OmCurrentWeather>,
    daily: Option<OmDaily>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch_weather(&self, coords: Coordinates) -> Result<WeatherReport, FetchError> {
        let request = self.http.get(&self.base_url).query(&[
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("current_weather", "true".to_string()),
            ("daily", DAILY_FIELDS.to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", FORECAST_DAYS.to_string()),
        ]);

        let parsed: OmResponse = get_json(request, SERVICE).await?;
        into_report(parsed)
    }
}

fn into_report(parsed: OmResponse) -> Result<WeatherReport, FetchError> {
    let current = parsed
        .current_weather
        .ok_or(FetchError::MissingSection { service: SERVICE, section: "current_weather" })?;
    let daily = parsed
        .daily
        .ok_or(FetchError::MissingSection { service: SERVICE, section: "daily" })?;

    let current = CurrentConditions {
        temperature_c: current.temperature,
        weather_code: current.weathercode,
        wind_speed_kmh: current.windspeed,
        observed_at: parse_local_time(&current.time)?,
    };

    let days = daily
        .time
        .iter()
        .zip(&daily.weathercode)
        .zip(daily.temperature_2m_max.iter().zip(&daily.temperature_2m_min))
        .map(|((date, code), (max, min))| {
            Ok(DailyForecastEntry {
                date: parse_date(date)?,
                max_temp_c: *max,
                min_temp_c: *min,
                weather_code: *code,
            })
        })
        .collect::<Result<Vec<_>, FetchError>>()?;

    Ok(WeatherReport { current, daily: days })
}

fn parse_local_time(value: &str) -> Result<NaiveDateTime, FetchError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| FetchError::InvalidValue {
            service: SERVICE,
            field: "current_weather.time",
            value: value.to_string(),
        })
}

fn parse_date(value: &str) -> Result<NaiveDate, FetchError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FetchError::InvalidValue {
        service: SERVICE,
        field: "daily.time",
        value: value.to_string(),
    })
}
