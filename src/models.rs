use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A user-selected query mode.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum EventQueryIntent {
    Featured,
    JustAnnounced,
    ThisWeekend,
    Search { city: String },
}

impl EventQueryIntent {
    pub fn label(&self) -> &'static str {
        match self {
            EventQueryIntent::Featured => "featured",
            EventQueryIntent::JustAnnounced => "just_announced",
            EventQueryIntent::ThisWeekend => "this_weekend",
            EventQueryIntent::Search { .. } => "search",
        }
    }
}

/// Where a query's location came from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryScope {
    Detected(String),
    Searched(String),
    Market(u32),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CityOrigin {
    Detected,
    Searched,
    Market,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(text) => f.write_str(text),
            ParamValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(i64::from(value))
    }
}

/// Search parameters for one events request. Keys are kept sorted so the
/// same inputs always serialize identically.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QueryParameters {
    pub origin: CityOrigin,
    values: BTreeMap<String, ParamValue>,
}

impl QueryParameters {
    pub fn new(origin: CityOrigin) -> Self {
        Self {
            origin,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The city or market the query targets, for user-facing messages.
    pub fn place(&self) -> Option<String> {
        self.get("city")
            .or_else(|| self.get("dmaId"))
            .map(ToString::to_string)
    }
}

/// One event card, projected from the nested API payload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub name: Option<String>,
    pub local_date: Option<String>,
    pub local_time: Option<String>,
    pub venue_name: Option<String>,
    pub artists: Option<String>,
    pub genre: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkError,
    ApiError,
    LocationError,
    NotFoundError,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingLocation,
    Loading,
    Ready,
    Error,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Pending,
    Resolved,
    Failed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AppState {
    /// `None` after a failed fetch; rendered as "no events".
    pub events: Option<Vec<EventRecord>>,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
    pub city: Option<String>,
    pub pending_intent: Option<EventQueryIntent>,
    pub phase: Phase,
    pub location: LocationStatus,
    /// Sequence number of the most recently dispatched request.
    pub version: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            events: Some(Vec::new()),
            is_loading: false,
            error: None,
            city: None,
            pending_intent: None,
            phase: Phase::Idle,
            location: LocationStatus::Pending,
            version: 0,
        }
    }
}

impl AppState {
    pub fn event_count(&self) -> usize {
        self.events.as_ref().map_or(0, Vec::len)
    }
}
