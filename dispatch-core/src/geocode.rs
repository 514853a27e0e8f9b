use crate::model::GeoPoint;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "ambulance_dispatch_app";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("reverse geocoding timed out")]
    Timeout,
    #[error("no place found for the coordinates")]
    NotFound,
    #[error("geocoding service unreachable: {0}")]
    Unreachable(String),
    #[error("unexpected geocoding response: {0}")]
    InvalidResponse(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Turns a coordinate pair into the service's single best-match description.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync + 'static {
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodeError>;
}

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeocodeError::Unreachable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.lat.to_string()),
                ("lon", point.lng.to_string()),
            ])
            .send()
            .await
            .map_err(classify)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(GeocodeError::NotFound),
            status if !status.is_success() => {
                return Err(GeocodeError::Unreachable(format!("http status {status}")));
            }
            _ => {}
        }

        let body: ReverseResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeocodeError::Timeout
            } else {
                GeocodeError::InvalidResponse(e.to_string())
            }
        })?;

        if body.error.is_some() {
            return Err(GeocodeError::NotFound);
        }
        body.display_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(GeocodeError::NotFound)
    }
}

fn classify(err: reqwest::Error) -> GeocodeError {
    if err.is_timeout() {
        GeocodeError::Timeout
    } else {
        GeocodeError::Unreachable(err.to_string())
    }
}

/// First comma-separated segment of a full address, e.g. the road or
/// landmark name.
pub fn short_label(display_name: &str) -> String {
    display_name
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
