use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::FinderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Platform permission state for location access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Prompt,
    Denied,
    Unsupported,
}

/// Platform location capability.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn permission(&self) -> Permission;

    /// Acquires a fix. Implementations show the native prompt when the
    /// permission state is `Prompt`.
    async fn current_position(&self) -> Result<Coordinates, FinderError>;
}

/// Produces the user's city name.
#[async_trait]
pub trait CityResolver: Send + Sync {
    async fn resolve_city(&self) -> Result<String, FinderError>;
}

/// A position supplied up front, e.g. from configuration.
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn current_position(&self) -> Result<Coordinates, FinderError> {
        Ok(self.0)
    }
}

/// A platform without location support.
pub struct NoPosition;

#[async_trait]
impl PositionSource for NoPosition {
    async fn permission(&self) -> Permission {
        Permission::Unsupported
    }

    async fn current_position(&self) -> Result<Coordinates, FinderError> {
        Err(FinderError::Location(unsupported_message()))
    }
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    city: Option<String>,
    locality: Option<String>,
}

pub struct ReverseGeocoder {
    client: Client,
    endpoint: Url,
}

impl ReverseGeocoder {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&config.geocode_endpoint)
            .with_context(|| format!("invalid geocode endpoint {}", config.geocode_endpoint))?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build geocode client")?;
        Ok(Self { client, endpoint })
    }

    pub async fn city_for(&self, coords: Coordinates) -> Result<String, FinderError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("latitude", &coords.latitude.to_string())
            .append_pair("longitude", &coords.longitude.to_string())
            .append_pair("localityLanguage", "en");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FinderError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FinderError::Network(format!(
                "reverse geocoding failed with status {status}"
            )));
        }
        let payload: ReverseGeocodeResponse = response
            .json()
            .await
            .map_err(|err| FinderError::Network(err.to_string()))?;

        [payload.city, payload.locality]
            .into_iter()
            .flatten()
            .map(|name| name.trim().to_string())
            .find(|name| !name.is_empty())
            .ok_or_else(|| {
                FinderError::Location("Could not determine your city from your location".into())
            })
    }
}

pub struct GeolocationResolver {
    source: Arc<dyn PositionSource>,
    geocoder: ReverseGeocoder,
}

impl GeolocationResolver {
    pub fn new(source: Arc<dyn PositionSource>, geocoder: ReverseGeocoder) -> Self {
        Self { source, geocoder }
    }

    /// Uses the configured fixed position when present; otherwise location is unsupported.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let source: Arc<dyn PositionSource> = match config.fixed_position() {
            Some((latitude, longitude)) => Arc::new(FixedPosition(Coordinates {
                latitude,
                longitude,
            })),
            None => Arc::new(NoPosition),
        };
        Ok(Self::new(source, ReverseGeocoder::new(config)?))
    }
}

#[async_trait]
impl CityResolver for GeolocationResolver {
    async fn resolve_city(&self) -> Result<String, FinderError> {
        match self.source.permission().await {
            Permission::Unsupported => {
                return Err(FinderError::Location(unsupported_message()));
            }
            Permission::Denied => {
                warn!("location permission denied");
                return Err(FinderError::Location(
                    "Location permission denied. Search for a city instead.".into(),
                ));
            }
            Permission::Prompt => debug!("requesting location permission"),
            Permission::Granted => {}
        }

        let coords = self.source.current_position().await?;
        let city = self.geocoder.city_for(coords).await?;
        info!(%city, "city resolved");
        Ok(city)
    }
}

fn unsupported_message() -> String {
    "Location is not available on this device. Search for a city instead.".to_string()
}
