//! Core library for the `tenki` weather widget.
//!
//! This crate defines:
//! - Shared domain models (coordinates, labels, reports, statuses)
//! - Weather code descriptions
//! - Geocoding and pluggable weather backends
//! - Location acquisition (sensor or place search)
//! - The presentation controller that owns the widget state
//! - Configuration & credentials handling
//!
//! It is used by `tenki-cli`, but can also be driven by any other front end
//! that implements [`View`].

pub mod codes;
pub mod config;
pub mod controller;
pub mod error;
pub mod geocode;
mod http;
pub mod location;
pub mod messages;
pub mod model;
pub mod provider;

pub use config::{Config, PositionMode, ProviderConfig, SensorConfig, SensorKind};
pub use controller::{Origin, PresentationController, View, WidgetState};
pub use error::{FetchError, LocationError};
pub use geocode::GeocodingClient;
pub use location::{LocationProvider, LocationSensor, PositionOptions, TriggerState};
pub use model::{
    Coordinates, CurrentConditions, DailyForecastEntry, PlaceLabel, SearchCandidate, Severity,
    UiStatus, WeatherReport,
};
pub use provider::{ProviderId, WeatherProvider};
