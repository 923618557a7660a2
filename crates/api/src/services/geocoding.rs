//! Reverse geocoding through the Google Geocoding API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use domain::error::TransientCollaboratorError;
use domain::models::Coordinate;
use domain::services::{Geocoder, NoopGeocoder};

use crate::config::GeocodingConfig;

const GEOCODE_PATH: &str = "maps/api/geocode/json";

/// Errors that can occur during reverse geocoding.
#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("Geocoding service URL not configured")]
    NotConfigured,

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Invalid response from geocoding service: {0}")]
    InvalidResponse(String),

    #[error("Geocoding service error: {0}")]
    ServiceError(String),
}

// Request URLs carry the API key; never keep them in errors that get logged.
impl From<reqwest::Error> for GeocodingError {
    fn from(err: reqwest::Error) -> Self {
        GeocodingError::Http(err.without_url())
    }
}

impl From<GeocodingError> for TransientCollaboratorError {
    fn from(err: GeocodingError) -> Self {
        TransientCollaboratorError::Geocoding(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

impl GeocodeResponse {
    fn into_address(self) -> Result<Option<String>, GeocodingError> {
        match self.status.as_str() {
            "OK" => Ok(self
                .results
                .into_iter()
                .map(|r| r.formatted_address)
                .find(|a| !a.trim().is_empty())),
            "ZERO_RESULTS" => Ok(None),
            status => Err(GeocodingError::ServiceError(match self.error_message {
                Some(message) => format!("{}: {}", status, message),
                None => status.to_string(),
            })),
        }
    }
}

/// Client for the Google Geocoding API.
pub struct GoogleGeocoder {
    client: Client,
    config: GeocodingConfig,
}

impl GoogleGeocoder {
    pub fn new(config: GeocodingConfig) -> Result<Self, GeocodingError> {
        if config.url.trim().is_empty() {
            return Err(GeocodingError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.config.url.trim().trim_end_matches('/'), GEOCODE_PATH)
    }

    /// Looks up the first formatted address for `coordinate`.
    pub async fn lookup(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodingError> {
        let latlng = format!("{},{}", coordinate.lat, coordinate.lng);
        debug!(latlng = %latlng, "Sending reverse geocoding request");

        let response = self
            .client
            .get(self.endpoint())
            .query(&[("latlng", latlng.as_str()), ("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodingError::Timeout(self.config.timeout_ms)
                } else {
                    GeocodingError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodingError::ServiceError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodingError::InvalidResponse(e.without_url().to_string()))?;

        body.into_address()
    }
}

#[async_trait::async_trait]
impl Geocoder for GoogleGeocoder {
    async fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<String>, TransientCollaboratorError> {
        Ok(self.lookup(coordinate).await?)
    }
}

/// Builds the geocoder selected by configuration.
pub fn build_geocoder(config: &GeocodingConfig) -> Result<Arc<dyn Geocoder>, GeocodingError> {
    if !config.enabled {
        info!("Reverse geocoding disabled");
        return Ok(Arc::new(NoopGeocoder));
    }

    info!(url = %config.url, "Reverse geocoding enabled");
    Ok(Arc::new(GoogleGeocoder::new(config.clone())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> GeocodingConfig {
        GeocodingConfig {
            enabled: true,
            url: url.to_string(),
            api_key: "key".to_string(),
            timeout_ms: 1000,
        }
    }

    fn parse(json: &str) -> GeocodeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_ok_returns_first_address() {
        let response = parse(
            r#"{"status":"OK","results":[
                {"formatted_address":"Shahrah-e-Faisal, Karachi, Pakistan"},
                {"formatted_address":"Karachi, Pakistan"}
            ]}"#,
        );
        assert_eq!(
            response.into_address().unwrap().as_deref(),
            Some("Shahrah-e-Faisal, Karachi, Pakistan")
        );
    }

    #[test]
    fn test_zero_results_is_none() {
        let response = parse(r#"{"status":"ZERO_RESULTS","results":[]}"#);
        assert_eq!(response.into_address().unwrap(), None);
    }

    #[test]
    fn test_denied_is_service_error() {
        let response = parse(
            r#"{"status":"REQUEST_DENIED","error_message":"The provided API key is invalid."}"#,
        );
        match response.into_address() {
            Err(GeocodingError::ServiceError(msg)) => {
                assert!(msg.starts_with("REQUEST_DENIED"));
                assert!(msg.contains("API key"));
            }
            other => panic!("Expected ServiceError, got {:?}", other),
        }
    }

    #[test]
    fn test_new_requires_url() {
        assert!(matches!(
            GoogleGeocoder::new(config("  ")),
            Err(GeocodingError::NotConfigured)
        ));
    }

    #[test]
    fn test_endpoint() {
        let geocoder = GoogleGeocoder::new(config("https://maps.googleapis.com/")).unwrap();
        assert_eq!(
            geocoder.endpoint(),
            "https://maps.googleapis.com/maps/api/geocode/json"
        );
    }

    #[test]
    fn test_error_maps_to_transient() {
        let err: TransientCollaboratorError = GeocodingError::Timeout(1000).into();
        assert_eq!(
            err,
            TransientCollaboratorError::Geocoding("Request timeout after 1000ms".to_string())
        );
    }

    #[tokio::test]
    async fn test_transport_error_hides_api_key() {
        let mut unreachable = config("http://127.0.0.1:1");
        unreachable.api_key = "SECRET_KEY_123".to_string();
        let geocoder = GoogleGeocoder::new(unreachable).unwrap();

        let err = geocoder
            .reverse_geocode(Coordinate::new(1.0, 2.0))
            .await
            .unwrap_err();

        let TransientCollaboratorError::Geocoding(message) = err else {
            panic!("Expected a geocoding error");
        };
        assert!(!message.is_empty());
        assert!(!message.contains("SECRET_KEY_123"));
        assert!(!message.contains("key="));
    }

    #[tokio::test]
    async fn test_disabled_geocoder_returns_none() {
        let mut disabled = config("https://maps.googleapis.com");
        disabled.enabled = false;
        let geocoder = build_geocoder(&disabled).unwrap();
        let address = geocoder
            .reverse_geocode(Coordinate::new(24.86, 67.0))
            .await
            .unwrap();
        assert!(address.is_none());
    }
}
