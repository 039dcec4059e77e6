//! Persisted flight samples and route types.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::duration::{DurationTier, FlightTimes};
use crate::flight::Flight;

/// Current time in epoch milliseconds, the unit of `record_date`.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// One observed flight status sample, as stored in `flight_records`.
///
/// Rows are keyed by `(flight_number, record_date)`; timestamps are epoch
/// milliseconds and delays are minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Row id assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Flight number, e.g. `"BA117"`. Repeats across days.
    pub flight_number: String,
    /// Departure airport code.
    pub departure_airport: String,
    /// Arrival airport code.
    pub arrival_airport: String,
    /// When the sample was taken.
    pub record_date: i64,
    /// Scheduled departure.
    pub scheduled_departure_time: Option<i64>,
    /// Scheduled arrival.
    pub scheduled_arrival_time: Option<i64>,
    /// Actual departure.
    pub actual_departure_time: Option<i64>,
    /// Actual arrival.
    pub actual_arrival_time: Option<i64>,
    /// Departure delay in minutes.
    pub departure_delay_minutes: Option<i64>,
    /// Arrival delay in minutes.
    pub arrival_delay_minutes: Option<i64>,
    /// Precomputed duration in minutes, when known at insert time.
    pub flight_time: Option<i64>,
}

impl FlightRecord {
    /// Create a record with only its identifying fields set.
    #[must_use]
    pub fn new(
        flight_number: impl Into<String>,
        departure_airport: impl Into<String>,
        arrival_airport: impl Into<String>,
        record_date: i64,
    ) -> Self {
        Self {
            flight_number: flight_number.into(),
            departure_airport: departure_airport.into(),
            arrival_airport: arrival_airport.into(),
            record_date,
            ..Self::default()
        }
    }

    /// Build a record from a snapshot observed at `record_date`.
    ///
    /// Unknown identifiers are stored as empty strings. `flight_time` is left
    /// unset so the stored timestamps stay the source of truth.
    #[must_use]
    pub fn from_flight(flight: &Flight, record_date: i64) -> Self {
        let times = FlightTimes::from_flight(flight);
        Self {
            id: None,
            flight_number: flight.flight_iata().unwrap_or_default().to_string(),
            departure_airport: flight.departure_iata().unwrap_or_default().to_string(),
            arrival_airport: flight.arrival_iata().unwrap_or_default().to_string(),
            record_date,
            scheduled_departure_time: times.scheduled_departure,
            scheduled_arrival_time: times.scheduled_arrival,
            actual_departure_time: times.actual_departure,
            actual_arrival_time: times.actual_arrival,
            departure_delay_minutes: times.departure_delay_minutes,
            arrival_delay_minutes: times.arrival_delay_minutes,
            flight_time: None,
        }
    }

    /// Set the precomputed duration.
    #[must_use]
    pub fn with_flight_time(mut self, minutes: i64) -> Self {
        self.flight_time = Some(minutes);
        self
    }

    /// The route this record belongs to.
    #[must_use]
    pub fn route(&self) -> RouteInfo {
        RouteInfo::new(&self.departure_airport, &self.arrival_airport)
    }

    /// Timing inputs for the duration calculator.
    #[must_use]
    pub fn times(&self) -> FlightTimes {
        FlightTimes {
            scheduled_departure: self.scheduled_departure_time,
            scheduled_arrival: self.scheduled_arrival_time,
            actual_departure: self.actual_departure_time,
            actual_arrival: self.actual_arrival_time,
            departure_delay_minutes: self.departure_delay_minutes,
            arrival_delay_minutes: self.arrival_delay_minutes,
        }
    }

    /// The tier this row's duration comes from, if any.
    #[must_use]
    pub fn duration_tier(&self) -> Option<DurationTier> {
        if self.flight_time.is_some() {
            Some(DurationTier::Recorded)
        } else {
            self.times().tier()
        }
    }

    /// Row duration in minutes as the route average sees it.
    ///
    /// `flight_time` wins when set, then the actual pair, then the delayed
    /// scheduled pair. Values are not clamped.
    #[must_use]
    pub fn duration_minutes(&self) -> Option<i64> {
        self.flight_time.or_else(|| self.times().signed_minutes())
    }
}

/// An ordered (departure, arrival) airport pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Departure airport code.
    pub departure_airport: String,
    /// Arrival airport code.
    pub arrival_airport: String,
}

impl RouteInfo {
    /// Create a route.
    #[must_use]
    pub fn new(departure_airport: impl Into<String>, arrival_airport: impl Into<String>) -> Self {
        Self {
            departure_airport: departure_airport.into(),
            arrival_airport: arrival_airport.into(),
        }
    }
}

impl fmt::Display for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.departure_airport, self.arrival_airport)
    }
}

/// Average duration and sample count for a route over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// The route.
    pub route: RouteInfo,
    /// Window start in epoch milliseconds.
    pub since: i64,
    /// Mean duration in minutes, `None` if no row had a usable duration.
    pub average_minutes: Option<i64>,
    /// Rows in the window.
    pub flight_count: i64,
}
