//! Local music event discovery.
//!
//! [`EventController`] owns the UI state: it resolves the user's city once,
//! turns button clicks and searches into Ticketmaster queries, and publishes
//! every transition for a presentation layer to render.

pub mod config;
pub mod controller;
pub mod error;
pub mod geolocation;
pub mod logging;
pub mod models;
pub mod notify;
pub mod query;
pub mod ticketmaster;
mod utils;

pub use config::AppConfig;
pub use controller::EventController;
pub use error::FinderError;
pub use geolocation::{
    CityResolver, Coordinates, FixedPosition, GeolocationResolver, NoPosition, Permission,
    PositionSource, ReverseGeocoder,
};
pub use models::{
    AppState, CityOrigin, ErrorInfo, ErrorKind, EventQueryIntent, EventRecord, LocationStatus,
    ParamValue, Phase, QueryParameters, QueryScope,
};
pub use notify::{Notice, Notifier};
pub use query::build_params;
pub use ticketmaster::{EventSource, TicketmasterClient};

use tokio::task::JoinHandle;

/// Loads configuration, installs logging, and starts location resolution.
///
/// The returned handle completes once startup location resolution has
/// settled, including any queued request it released. Dropping it detaches
/// the task. Must be called from within a Tokio runtime.
pub fn run() -> anyhow::Result<(EventController, JoinHandle<()>)> {
    logging::init();
    let config = AppConfig::load()?;
    let controller = EventController::from_config(&config)?;
    let startup = controller.start();
    Ok((controller, startup))
}
