//! `flightstats` - Flight durations and route history
//!
//! This library derives flight durations from partially-missing timestamp
//! data and keeps a local `SQLite` history of observed flights for per-route
//! statistics.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod duration;
pub mod error;
pub mod flight;
pub mod logging;
pub mod record;
pub mod storage;

pub use config::Config;
pub use duration::{
    flight_duration_minutes, flight_time_display, format_date_time, format_duration,
    parse_timestamp, DurationTier, FlightTimes,
};
pub use error::{Error, Result};
pub use flight::Flight;
pub use logging::init_logging;
pub use record::{FlightRecord, RouteInfo, RouteSummary};
pub use storage::{FlightStore, RecordsSubscription, StoreStats};
