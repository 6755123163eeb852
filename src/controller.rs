use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::FinderError;
use crate::geolocation::{CityResolver, GeolocationResolver};
use crate::models::{
    AppState, ErrorInfo, ErrorKind, EventQueryIntent, LocationStatus, Phase, QueryScope,
};
use crate::notify::{Notice, Notifier};
use crate::query::build_params;
use crate::ticketmaster::{EventSource, TicketmasterClient};
use crate::utils;

const LOCATION_UNAVAILABLE: &str = "Your location is unavailable. Search for a city instead.";
const EMPTY_SEARCH: &str = "Enter a city to search.";

/// Owns the application state and runs every transition on it.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct EventController {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<AppState>,
    updates: watch::Sender<AppState>,
    source: Arc<dyn EventSource>,
    resolver: Arc<dyn CityResolver>,
    market: Option<u32>,
    notifier: Notifier,
    location_started: AtomicBool,
}

/// What `request` decided while holding the state lock.
enum Route {
    /// Already marked as in flight under `version`.
    Dispatch(QueryScope, u64),
    Queued,
    Blocked,
}

impl EventController {
    pub fn new(
        source: Arc<dyn EventSource>,
        resolver: Arc<dyn CityResolver>,
        market: Option<u32>,
    ) -> Self {
        let (updates, _) = watch::channel(AppState::default());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(AppState::default()),
                updates,
                source,
                resolver,
                market,
                notifier: Notifier::new(),
                location_started: AtomicBool::new(false),
            }),
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let source = Arc::new(TicketmasterClient::new(config)?);
        let resolver = Arc::new(GeolocationResolver::from_config(config)?);
        Ok(Self::new(source, resolver, config.default_dma_id))
    }

    /// Kicks off location resolution in the background.
    pub fn start(&self) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move { controller.resolve_location().await })
    }

    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.inner.updates.subscribe()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notice> {
        self.inner.notifier.subscribe()
    }

    pub fn visible_notification(&self) -> Option<Notice> {
        self.inner.notifier.visible()
    }

    pub fn dismiss_notification(&self) {
        self.inner.notifier.dismiss();
    }

    /// Resolves the user's city once, then releases any queued intent.
    pub async fn resolve_location(&self) {
        if self.inner.location_started.swap(true, Ordering::SeqCst) {
            debug!("location resolution already started");
            return;
        }

        match self.inner.resolver.resolve_city().await {
            Ok(city) => {
                let pending = self.update(|state| {
                    state.city = Some(city.clone());
                    state.location = LocationStatus::Resolved;
                    release_pending(state)
                });
                if let Some((intent, version)) = pending {
                    self.dispatch(intent, QueryScope::Detected(city), version).await;
                }
            }
            Err(err) => {
                warn!(error = %err, "location unavailable");
                if let Some(dma) = self.inner.market {
                    let pending = self.update(|state| {
                        state.location = LocationStatus::Failed;
                        release_pending(state)
                    });
                    info!(dma, "falling back to default market");
                    if let Some((intent, version)) = pending {
                        self.dispatch(intent, QueryScope::Market(dma), version).await;
                    }
                    return;
                }

                self.update(|state| {
                    state.location = LocationStatus::Failed;
                    state.error = Some(ErrorInfo::from(&err));
                    if !state.is_loading {
                        state.phase = Phase::Error;
                    }
                });
                self.inner.notifier.raise(Notice::from(&err));
            }
        }
    }

    /// Records a user intent and dispatches it as soon as it has a location.
    pub async fn request(&self, intent: EventQueryIntent) {
        let intent = match intent {
            EventQueryIntent::Search { city } => {
                let city = utils::clean_text(&city);
                if city.is_empty() {
                    self.inner.notifier.raise(Notice {
                        kind: ErrorKind::NotFoundError,
                        message: EMPTY_SEARCH.to_string(),
                    });
                    return;
                }
                EventQueryIntent::Search { city }
            }
            other => other,
        };
        info!(intent = intent.label(), "intent received");

        let market = self.inner.market;
        let route = self.update(|state| {
            let scope = match (&intent, &state.city, state.location) {
                (EventQueryIntent::Search { city }, _, _) => Some(QueryScope::Searched(city.clone())),
                (_, Some(city), _) => Some(QueryScope::Detected(city.clone())),
                (_, None, LocationStatus::Failed) => market.map(QueryScope::Market),
                _ => None,
            };
            match scope {
                Some(scope) => Route::Dispatch(scope, begin_request(state)),
                None if state.location == LocationStatus::Failed => {
                    state.pending_intent = Some(intent.clone());
                    state.error = Some(ErrorInfo {
                        kind: ErrorKind::LocationError,
                        message: LOCATION_UNAVAILABLE.to_string(),
                    });
                    if !state.is_loading {
                        state.phase = Phase::Error;
                    }
                    Route::Blocked
                }
                None => {
                    state.pending_intent = Some(intent.clone());
                    if !state.is_loading {
                        state.phase = Phase::AwaitingLocation;
                    }
                    Route::Queued
                }
            }
        });

        match route {
            Route::Dispatch(scope, version) => self.dispatch(intent, scope, version).await,
            Route::Queued => debug!("intent queued until location resolves"),
            Route::Blocked => {
                self.inner.notifier.raise(Notice {
                    kind: ErrorKind::LocationError,
                    message: LOCATION_UNAVAILABLE.to_string(),
                });
            }
        }
    }

    /// Runs a request already marked in flight by `begin_request`.
    async fn dispatch(&self, intent: EventQueryIntent, scope: QueryScope, version: u64) {
        let params = build_params(&intent, Some(&scope), Utc::now());
        debug!(version, intent = intent.label(), "dispatching request");

        let result = self.inner.source.fetch_events(&params).await;

        let failure = self.update(|state| {
            if state.version != version {
                debug!(version, latest = state.version, "discarding stale response");
                return None;
            }
            state.is_loading = false;
            match result {
                Ok(events) => {
                    info!(count = events.len(), "events loaded");
                    state.events = Some(events);
                    state.error = None;
                    state.phase = Phase::Ready;
                    None
                }
                Err(err) => {
                    warn!(error = %err, "events request failed");
                    state.events = None;
                    state.error = Some(ErrorInfo::from(&err));
                    state.phase = Phase::Error;
                    Some(err)
                }
            }
        });

        if let Some(err) = failure {
            self.inner.notifier.raise(Notice::from(&err));
        }
    }

    /// Applies `transform` and publishes the new state while still holding the lock.
    fn update<R>(&self, transform: impl FnOnce(&mut AppState) -> R) -> R {
        let mut guard = self.lock();
        let out = transform(&mut guard);
        self.inner.updates.send_replace(guard.clone());
        out
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Marks a new request in flight and consumes the pending slot, so the
/// same intent cannot be picked up by a second path.
fn begin_request(state: &mut AppState) -> u64 {
    state.version += 1;
    state.pending_intent = None;
    state.is_loading = true;
    state.error = None;
    state.phase = Phase::Loading;
    state.version
}

/// Takes the queued intent, if any, and marks it in flight.
fn release_pending(state: &mut AppState) -> Option<(EventQueryIntent, u64)> {
    match state.pending_intent.take() {
        Some(intent) => Some((intent, begin_request(state))),
        None => {
            if state.phase == Phase::AwaitingLocation {
                state.phase = Phase::Idle;
            }
            None
        }
    }
}
