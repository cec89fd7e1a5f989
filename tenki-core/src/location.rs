//! Location acquisition: device sensor or geocoding search.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::{Host, Url};

use crate::{
    error::{FetchError, LocationError},
    geocode::GeocodingClient,
    http::default_client,
    messages,
    model::{Coordinates, SearchCandidate},
};

pub const DEFAULT_SENSOR_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IP_ENDPOINT: &str = "https://ipapi.co/json/";

/// How a position request should be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// `None` leaves accuracy to the sensor.
    pub high_accuracy: Option<bool>,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl PositionOptions {
    /// One-off lookup: low accuracy, fresh position, bounded wait.
    pub fn single_shot() -> Self {
        Self {
            high_accuracy: Some(false),
            timeout: DEFAULT_SENSOR_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }

    /// Repeated lookups: only the wait is fixed.
    pub fn continuous() -> Self {
        Self { high_accuracy: None, timeout: DEFAULT_SENSOR_TIMEOUT, maximum_age: Duration::ZERO }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::single_shot()
    }
}

/// Platform location service.
#[async_trait]
pub trait LocationSensor: Send + Sync + Debug {
    /// Fails with [`LocationError::Unsupported`] when the sensor cannot be used at all.
    fn availability(&self) -> Result<(), LocationError> {
        Ok(())
    }

    async fn current_position(&self, options: &PositionOptions)
    -> Result<Coordinates, LocationError>;
}

/// Sensor that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor(pub Coordinates);

#[async_trait]
impl LocationSensor for FixedSensor {
    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Stand-in for hosts without any location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedSensor;

#[async_trait]
impl LocationSensor for UnsupportedSensor {
    fn availability(&self) -> Result<(), LocationError> {
        Err(LocationError::Unsupported("no location sensor configured".into()))
    }

    async fn current_position(&self, _: &PositionOptions) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported("no location sensor configured".into()))
    }
}

/// Approximate position from an IP geolocation service.
#[derive(Debug, Clone)]
pub struct IpSensor {
    endpoint: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct IpPosition {
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon")]
    longitude: Option<f64>,
}

impl IpSensor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), http: default_client() }
    }
}

impl Default for IpSensor {
    fn default() -> Self {
        Self::new(DEFAULT_IP_ENDPOINT)
    }
}

#[async_trait]
impl LocationSensor for IpSensor {
    fn availability(&self) -> Result<(), LocationError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| LocationError::Unsupported(format!("invalid endpoint: {e}")))?;

        if is_secure_context(&url) {
            Ok(())
        } else {
            let origin = url.origin().ascii_serialization();
            Err(LocationError::Unsupported(format!("{origin} is not a secure origin")))
        }
    }

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, LocationError> {
        if options.high_accuracy == Some(true) {
            tracing::debug!("High accuracy requested; IP geolocation is city-level at best");
        }

        let res = self.http.get(&self.endpoint).timeout(options.timeout).send().await.map_err(
            |e| {
                if e.is_timeout() {
                    LocationError::Timeout
                } else if e.is_connect() {
                    LocationError::PositionUnavailable(e.to_string())
                } else {
                    LocationError::Other(e.to_string())
                }
            },
        )?;

        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LocationError::PermissionDenied);
            }
            status if !status.is_success() => {
                return Err(LocationError::PositionUnavailable(format!("status {status}")));
            }
            _ => {}
        }

        let body: IpPosition =
            res.json().await.map_err(|e| LocationError::PositionUnavailable(e.to_string()))?;

        match (body.latitude, body.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinates::new(latitude, longitude)),
            _ => Err(LocationError::PositionUnavailable("response has no coordinates".into())),
        }
    }
}

/// Secure transport, or a loopback host (treated as trustworthy like browsers do).
pub fn is_secure_context(url: &Url) -> bool {
    if url.scheme() == "https" {
        return true;
    }

    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Produces coordinates from either the sensor or a place search.
#[derive(Debug, Clone)]
pub struct LocationProvider {
    sensor: Arc<dyn LocationSensor>,
    options: PositionOptions,
    geocoder: GeocodingClient,
}

impl LocationProvider {
    pub fn new(
        sensor: Arc<dyn LocationSensor>,
        options: PositionOptions,
        geocoder: GeocodingClient,
    ) -> Self {
        Self { sensor, options, geocoder }
    }

    /// Sensor path; the label is resolved later by reverse lookup.
    pub async fn acquire(&self) -> Result<Coordinates, LocationError> {
        self.sensor.availability()?;

        let position = self.sensor.current_position(&self.options);
        match tokio::time::timeout(self.options.timeout, position).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        }
    }

    /// Search path; each candidate carries its own label.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, FetchError> {
        self.geocoder.search(query).await
    }
}

/// State of the control that starts a sensor lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle { has_succeeded: bool },
    Busy,
}

impl TriggerState {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerState::Idle { has_succeeded: false } => messages::TRIGGER_FIRST_USE,
            TriggerState::Idle { has_succeeded: true } => messages::TRIGGER_REFETCH,
            TriggerState::Busy => messages::TRIGGER_BUSY,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, TriggerState::Busy)
    }
}
