use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::FinderError;
use crate::models::{CityOrigin, EventRecord, QueryParameters};

const PREFERRED_IMAGE_RATIO: &str = "16_9";

/// Anything that can answer an events query.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, params: &QueryParameters)
        -> Result<Vec<EventRecord>, FinderError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<EmbeddedEvents>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedEvents {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    id: String,
    name: Option<String>,
    url: Option<String>,
    #[serde(default)]
    images: Vec<RawImage>,
    dates: Option<RawDates>,
    #[serde(default)]
    classifications: Vec<RawClassification>,
    #[serde(rename = "_embedded")]
    embedded: Option<RawEventEmbedded>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    url: Option<String>,
    ratio: Option<String>,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawDates {
    start: Option<RawStart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStart {
    local_date: Option<String>,
    local_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEventEmbedded {
    #[serde(default)]
    venues: Vec<Named>,
    #[serde(default)]
    attractions: Vec<RawAttraction>,
}

#[derive(Debug, Deserialize)]
struct RawAttraction {
    name: Option<String>,
    #[serde(default)]
    classifications: Vec<RawClassification>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    genre: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

pub struct TicketmasterClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    classification: String,
    page_size: u32,
}

impl TicketmasterClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let endpoint = Url::parse(&config.events_endpoint)
            .with_context(|| format!("invalid events endpoint {}", config.events_endpoint))?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build events client")?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            classification: config.classification.clone(),
            page_size: config.page_size,
        })
    }

    /// Merges the fixed classification and page size under the intent parameters.
    pub fn request_url(&self, params: &QueryParameters) -> Url {
        let mut merged = params.clone();
        if !merged.contains("classificationName") {
            merged.insert("classificationName", self.classification.as_str());
        }
        if !merged.contains("size") {
            merged.insert("size", self.page_size);
        }

        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in merged.iter() {
                pairs.append_pair(key, &value.to_string());
            }
            pairs.append_pair("apikey", &self.api_key);
        }
        url
    }
}

#[async_trait]
impl EventSource for TicketmasterClient {
    async fn fetch_events(
        &self,
        params: &QueryParameters,
    ) -> Result<Vec<EventRecord>, FinderError> {
        let url = self.request_url(params);
        info!(
            place = params.place().as_deref().unwrap_or("-"),
            origin = ?params.origin,
            "requesting events"
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FinderError::Network(err.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| FinderError::Api(err.to_string()))?;

        if !status.is_success() {
            warn!(%status, "events request rejected");
            return Err(FinderError::Api(server_message(status, &body)));
        }

        let events = parse_response(&body, params)?;
        debug!(count = events.len(), "events received");
        Ok(events)
    }
}

/// Projects a search payload into cards, preserving API order.
pub fn parse_response(
    body: &str,
    params: &QueryParameters,
) -> Result<Vec<EventRecord>, FinderError> {
    let payload: SearchResponse =
        serde_json::from_str(body).map_err(|err| FinderError::Api(err.to_string()))?;

    let events = payload
        .embedded
        .map(|embedded| embedded.events)
        .unwrap_or_default();
    if events.is_empty() {
        return Err(FinderError::NotFound(not_found_message(params)));
    }

    Ok(events.into_iter().map(project_event).collect())
}

pub fn project_event(raw: RawEvent) -> EventRecord {
    let start = raw.dates.and_then(|dates| dates.start);
    let (venues, attractions) = match raw.embedded {
        Some(embedded) => (embedded.venues, embedded.attractions),
        None => (Vec::new(), Vec::new()),
    };

    let venue_name = venues.into_iter().find_map(|venue| non_empty(venue.name));

    let genre = attractions
        .first()
        .and_then(|attraction| attraction.classifications.first())
        .or_else(|| raw.classifications.first())
        .and_then(|classification| classification.genre.as_ref())
        .and_then(|genre| non_empty(genre.name.clone()));

    let artist_names: Vec<String> = attractions
        .into_iter()
        .filter_map(|attraction| non_empty(attraction.name))
        .collect();
    let artists = if artist_names.is_empty() {
        None
    } else {
        Some(artist_names.join(", "))
    };

    EventRecord {
        id: raw.id,
        name: non_empty(raw.name),
        local_date: start.as_ref().and_then(|s| s.local_date.clone()),
        local_time: start.as_ref().and_then(|s| s.local_time.clone()),
        venue_name,
        artists,
        genre,
        url: non_empty(raw.url),
        image_url: pick_image(raw.images),
    }
}

fn pick_image(images: Vec<RawImage>) -> Option<String> {
    let preferred = images
        .iter()
        .filter(|image| image.ratio.as_deref() == Some(PREFERRED_IMAGE_RATIO))
        .filter(|image| image.url.is_some())
        .max_by_key(|image| image.width.unwrap_or(0))
        .and_then(|image| image.url.clone());
    preferred.or_else(|| images.into_iter().find_map(|image| image.url))
}

/// Blank strings count as absent; anything else passes through untouched.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn not_found_message(params: &QueryParameters) -> String {
    let place = params.place().unwrap_or_else(|| "your area".to_string());
    match params.origin {
        CityOrigin::Detected => format!("No events found near {place}."),
        CityOrigin::Searched => {
            format!("No events found for \"{place}\". Check the city name and try again.")
        }
        CityOrigin::Market => format!("No events found in market {place}."),
    }
}

/// Pulls the human-readable reason out of an error payload.
fn server_message(status: reqwest::StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        value
            .pointer("/fault/faultstring")
            .or_else(|| value.pointer("/errors/0/detail"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    });
    from_json
        .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}
