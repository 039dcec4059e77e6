//! Transient flight snapshot supplied by the flight-data service.
//!
//! Every field is optional: the upstream feed omits whatever it does not
//! know. The snapshot is never persisted as-is; see
//! [`FlightRecord::from_flight`](crate::record::FlightRecord::from_flight).

use serde::{Deserialize, Serialize};

/// A single flight status snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flight {
    /// Operating airline.
    pub airline: Option<Airline>,
    /// Flight identification codes.
    #[serde(rename = "flight")]
    pub flight_info: Option<FlightInfo>,
    /// Free-form status, e.g. `"scheduled"`, `"active"`, `"landed"`.
    #[serde(rename = "flight_status")]
    pub status: Option<String>,
    /// Departure endpoint.
    pub departure: Option<Endpoint>,
    /// Arrival endpoint.
    pub arrival: Option<Endpoint>,
    /// Live telemetry, present only while tracking data is available.
    pub live: Option<LiveData>,
}

/// Airline details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Airline {
    /// Airline name.
    pub name: Option<String>,
}

/// Flight codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightInfo {
    /// IATA flight code, e.g. `"BA117"`.
    pub iata: Option<String>,
}

/// One end of a flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    /// Airport name.
    pub airport: Option<String>,
    /// IATA airport code.
    pub iata: Option<String>,
    /// Scheduled time, `YYYY-MM-DDTHH:mm:ss` without an offset.
    pub scheduled: Option<String>,
    /// Actual time, same format as `scheduled`.
    pub actual: Option<String>,
    /// Delay in minutes.
    pub delay: Option<i64>,
}

/// Live telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveData {
    /// When the telemetry was last updated.
    pub updated: Option<String>,
    /// Altitude in feet.
    pub altitude: Option<f64>,
    /// Ground speed in km/h.
    pub speed_horizontal: Option<f64>,
    /// Vertical speed in m/s.
    pub speed_vertical: Option<f64>,
    /// Heading in degrees.
    pub direction: Option<f64>,
    /// Latitude in degrees.
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    pub longitude: Option<f64>,
    /// Whether the aircraft is on the ground.
    pub is_ground: Option<bool>,
}

impl Flight {
    /// Parse a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// IATA flight code, if known.
    #[must_use]
    pub fn flight_iata(&self) -> Option<&str> {
        self.flight_info.as_ref()?.iata.as_deref()
    }

    /// Airline name, if known.
    #[must_use]
    pub fn airline_name(&self) -> Option<&str> {
        self.airline.as_ref()?.name.as_deref()
    }

    /// Departure airport IATA code, if known.
    #[must_use]
    pub fn departure_iata(&self) -> Option<&str> {
        self.departure.as_ref()?.iata.as_deref()
    }

    /// Arrival airport IATA code, if known.
    #[must_use]
    pub fn arrival_iata(&self) -> Option<&str> {
        self.arrival.as_ref()?.iata.as_deref()
    }

    /// Whether the flight is reported on the ground. `None` without telemetry.
    #[must_use]
    pub fn is_on_ground(&self) -> Option<bool> {
        self.live.as_ref()?.is_ground
    }
}

impl Endpoint {
    /// Scheduled time string.
    #[must_use]
    pub fn scheduled(&self) -> Option<&str> {
        self.scheduled.as_deref()
    }

    /// Actual time string.
    #[must_use]
    pub fn actual(&self) -> Option<&str> {
        self.actual.as_deref()
    }
}
