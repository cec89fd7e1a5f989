use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    geocode::{self, GeocodingClient},
    location::{
        DEFAULT_IP_ENDPOINT, DEFAULT_SENSOR_TIMEOUT, FixedSensor, IpSensor, LocationSensor,
        PositionOptions, UnsupportedSensor,
    },
    model::Coordinates,
    provider::{ProviderId, open_meteo, openweather},
};

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    #[default]
    Ip,
    Fixed,
    None,
}

/// Which [`PositionOptions`] preset the sensor is queried with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionMode {
    #[default]
    SingleShot,
    Continuous,
}

/// `[sensor]` table: where the "device" position comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    pub endpoint: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub mode: PositionMode,
    pub timeout_secs: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Ip,
            endpoint: DEFAULT_IP_ENDPOINT.to_string(),
            latitude: None,
            longitude: None,
            mode: PositionMode::SingleShot,
            timeout_secs: DEFAULT_SENSOR_TIMEOUT.as_secs(),
        }
    }
}

impl SensorConfig {
    pub fn position_options(&self) -> PositionOptions {
        let preset = match self.mode {
            PositionMode::SingleShot => PositionOptions::single_shot(),
            PositionMode::Continuous => PositionOptions::continuous(),
        };
        PositionOptions { timeout: Duration::from_secs(self.timeout_secs), ..preset }
    }

    pub fn build_sensor(&self) -> Result<Arc<dyn LocationSensor>> {
        let sensor: Arc<dyn LocationSensor> = match self.kind {
            SensorKind::Ip => Arc::new(IpSensor::new(self.endpoint.clone())),
            SensorKind::Fixed => {
                let (Some(lat), Some(lon)) = (self.latitude, self.longitude) else {
                    return Err(anyhow!(
                        "Sensor kind 'fixed' needs both `latitude` and `longitude` in [sensor]."
                    ));
                };
                Arc::new(FixedSensor(Coordinates::new(lat, lon)))
            }
            SensorKind::None => Arc::new(UnsupportedSensor),
        };

        Ok(sensor)
    }
}

/// `[endpoints]` table: optional overrides of the public API URLs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoding_search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoding_reverse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openweather: Option<String>,
}

impl Endpoints {
    pub fn forecast_url(&self) -> &str {
        self.forecast.as_deref().unwrap_or(open_meteo::DEFAULT_FORECAST_URL)
    }

    pub fn search_url(&self) -> &str {
        self.geocoding_search.as_deref().unwrap_or(geocode::DEFAULT_SEARCH_URL)
    }

    pub fn reverse_url(&self) -> &str {
        self.geocoding_reverse.as_deref().unwrap_or(geocode::DEFAULT_REVERSE_URL)
    }

    pub fn openweather_url(&self) -> &str {
        self.openweather.as_deref().unwrap_or(openweather::DEFAULT_BASE_URL)
    }
}

fn default_language() -> String {
    "ja".to_string()
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Optional default provider id, e.g. "open-meteo" or "openweather".
    pub default_provider: Option<String>,

    /// Language requested from the APIs.
    #[serde(default = "default_language")]
    pub language: String,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            language: default_language(),
            providers: HashMap::new(),
            sensor: SensorConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    /// Falls back to the keyless Open-Meteo backend.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::OpenMeteo),
        }
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn geocoder(&self) -> GeocodingClient {
        GeocodingClient::new(
            self.endpoints.search_url(),
            self.endpoints.reverse_url(),
            self.language.clone(),
        )
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "tenki", "tenki")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        !provider_id.requires_api_key() || self.provider_api_key(provider_id).is_some()
    }
}
