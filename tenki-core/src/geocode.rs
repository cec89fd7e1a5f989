//! Forward and reverse geocoding against the Open-Meteo geocoding API.

use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    http::{default_client, get_json},
    model::{Coordinates, PlaceLabel, SearchCandidate},
};

pub const DEFAULT_SEARCH_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_REVERSE_URL: &str = "https://geocoding-api.open-meteo.com/v1/reverse";

/// Upper bound on candidates returned by [`GeocodingClient::search`].
pub const MAX_CANDIDATES: usize = 5;

const SERVICE: &str = "geocoding";

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<SearchCandidate>,
}

#[derive(Debug, Clone)]
pub struct GeocodingClient {
    search_url: String,
    reverse_url: String,
    language: String,
    http: Client,
}

impl GeocodingClient {
    pub fn new(
        search_url: impl Into<String>,
        reverse_url: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            search_url: search_url.into(),
            reverse_url: reverse_url.into(),
            language: language.into(),
            http: default_client(),
        }
    }

    /// Resolves coordinates to a place label.
    ///
    /// Never fails: an empty result set or any request error yields
    /// [`PlaceLabel::from_coordinates`].
    pub async fn reverse_lookup(&self, coords: Coordinates) -> PlaceLabel {
        let request = self.http.get(&self.reverse_url).query(&[
            ("latitude", coords.latitude.to_string()),
            ("longitude", coords.longitude.to_string()),
            ("language", self.language.clone()),
            ("format", "json".to_string()),
        ]);

        match get_json::<GeoResponse>(request, SERVICE).await {
            Ok(parsed) => match parsed.results.first() {
                Some(place) => place.label(),
                None => {
                    tracing::debug!(?coords, "Reverse geocode returned no results");
                    PlaceLabel::from_coordinates(coords)
                }
            },
            Err(e) => {
                tracing::debug!(?coords, "Reverse geocode failed: {e}");
                PlaceLabel::from_coordinates(coords)
            }
        }
    }

    /// Looks up to [`MAX_CANDIDATES`] places matching `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, FetchError> {
        let request = self.http.get(&self.search_url).query(&[
            ("name", query.to_string()),
            ("count", MAX_CANDIDATES.to_string()),
            ("language", self.language.clone()),
            ("format", "json".to_string()),
        ]);

        let mut parsed: GeoResponse = get_json(request, SERVICE).await?;
        parsed.results.truncate(MAX_CANDIDATES);

        tracing::debug!(query, found = parsed.results.len(), "Geocoding search finished");
        Ok(parsed.results)
    }
}
