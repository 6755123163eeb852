use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils;

const DEFAULT_EVENTS_ENDPOINT: &str = "https://app.ticketmaster.com/discovery/v2/events.json";
const DEFAULT_GEOCODE_ENDPOINT: &str =
    "https://api.bigdatacloud.net/data/reverse-geocode-client";
const DEFAULT_CLASSIFICATION: &str = "music";
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_USER_AGENT: &str = "event-finder/0.1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub events_endpoint: String,
    pub geocode_endpoint: String,
    pub classification: String,
    pub page_size: u32,
    pub default_dma_id: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            events_endpoint: DEFAULT_EVENTS_ENDPOINT.to_string(),
            geocode_endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            classification: DEFAULT_CLASSIFICATION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            default_dma_id: None,
            latitude: None,
            longitude: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the config file (if any) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = read_config(&utils::config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("events API key is not configured (set EVENT_FINDER_API_KEY)"))
    }

    pub fn fixed_position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = ["EVENT_FINDER_API_KEY", "TICKETMASTER_API_KEY", "VITE_API_KEY"]
            .iter()
            .find_map(|name| lookup(*name))
        {
            self.api_key = Some(key);
        }
        if let Some(v) = lookup("EVENT_FINDER_EVENTS_ENDPOINT") {
            self.events_endpoint = v;
        }
        if let Some(v) = lookup("EVENT_FINDER_GEOCODE_ENDPOINT") {
            self.geocode_endpoint = v;
        }
        if let Some(v) = lookup("EVENT_FINDER_PAGE_SIZE").and_then(|s| s.parse::<u32>().ok()) {
            self.page_size = v;
        }
        if let Some(v) = lookup("EVENT_FINDER_DMA_ID").and_then(|s| s.parse::<u32>().ok()) {
            self.default_dma_id = Some(v);
        }
        if let Some(v) = lookup("EVENT_FINDER_LATITUDE").and_then(|s| s.parse::<f64>().ok()) {
            self.latitude = Some(v);
        }
        if let Some(v) = lookup("EVENT_FINDER_LONGITUDE").and_then(|s| s.parse::<f64>().ok()) {
            self.longitude = Some(v);
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid config file {}", path.display()))
}
