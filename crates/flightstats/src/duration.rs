//! Flight duration calculation.
//!
//! A flight's duration is derived from whichever timestamp pair is available,
//! in strict priority order:
//!
//! 1. actual departure and actual arrival
//! 2. scheduled departure and scheduled arrival, each shifted by its delay
//!
//! Anything else is unknown. Missing or malformed input never produces an
//! error; it produces `None`, which displays as `"N/A"`.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

use crate::flight::{Endpoint, Flight};

/// Milliseconds in a minute.
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Placeholder shown when a duration cannot be derived.
pub const UNKNOWN_DISPLAY: &str = "N/A";

/// Wire format of upstream timestamps.
const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Human-readable format for [`format_date_time`].
const DISPLAY_FORMAT: &str = "%b %d, %Y %H:%M";

/// Which source a duration was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationTier {
    /// A precomputed `flight_time` stored on the row.
    Recorded,
    /// Actual departure and arrival timestamps.
    Actual,
    /// Scheduled timestamps adjusted by delays.
    Scheduled,
}

impl fmt::Display for DurationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recorded => write!(f, "recorded"),
            Self::Actual => write!(f, "actual"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Timestamp and delay inputs for one flight, in epoch milliseconds and minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlightTimes {
    /// Scheduled departure.
    pub scheduled_departure: Option<i64>,
    /// Scheduled arrival.
    pub scheduled_arrival: Option<i64>,
    /// Actual departure.
    pub actual_departure: Option<i64>,
    /// Actual arrival.
    pub actual_arrival: Option<i64>,
    /// Departure delay in minutes.
    pub departure_delay_minutes: Option<i64>,
    /// Arrival delay in minutes.
    pub arrival_delay_minutes: Option<i64>,
}

impl FlightTimes {
    /// Extract the timing fields of a snapshot, parsing its timestamp strings.
    #[must_use]
    pub fn from_flight(flight: &Flight) -> Self {
        let departure = flight.departure.as_ref();
        let arrival = flight.arrival.as_ref();

        Self {
            scheduled_departure: departure.and_then(Endpoint::scheduled).and_then(parse_timestamp),
            scheduled_arrival: arrival.and_then(Endpoint::scheduled).and_then(parse_timestamp),
            actual_departure: departure.and_then(Endpoint::actual).and_then(parse_timestamp),
            actual_arrival: arrival.and_then(Endpoint::actual).and_then(parse_timestamp),
            departure_delay_minutes: departure.and_then(|d| d.delay),
            arrival_delay_minutes: arrival.and_then(|a| a.delay),
        }
    }

    /// The tier that applies to these inputs, if any.
    #[must_use]
    pub fn tier(&self) -> Option<DurationTier> {
        if self.actual_departure.is_some() && self.actual_arrival.is_some() {
            Some(DurationTier::Actual)
        } else if self.scheduled_departure.is_some() && self.scheduled_arrival.is_some() {
            Some(DurationTier::Scheduled)
        } else {
            None
        }
    }

    /// Signed duration in whole minutes from the highest applicable tier.
    ///
    /// Unlike [`flight_duration_minutes`] this keeps negative results, which
    /// is what the route average aggregates over.
    #[must_use]
    pub fn signed_minutes(&self) -> Option<i64> {
        match self.tier()? {
            DurationTier::Actual => {
                let span = self.actual_arrival?.checked_sub(self.actual_departure?)?;
                Some(span / MILLIS_PER_MINUTE)
            }
            DurationTier::Scheduled => {
                let departure = shift(
                    self.scheduled_departure?,
                    self.departure_delay_minutes.unwrap_or(0),
                )?;
                let arrival = shift(
                    self.scheduled_arrival?,
                    self.arrival_delay_minutes.unwrap_or(0),
                )?;
                Some(arrival.checked_sub(departure)? / MILLIS_PER_MINUTE)
            }
            DurationTier::Recorded => None,
        }
    }
}

fn shift(timestamp_ms: i64, delay_minutes: i64) -> Option<i64> {
    timestamp_ms.checked_add(delay_minutes.checked_mul(MILLIS_PER_MINUTE)?)
}

/// Parse an upstream `YYYY-MM-DDTHH:mm:ss` timestamp into epoch milliseconds.
///
/// The value carries no offset and is read as UTC wall-clock time. Anything
/// after the seconds field is ignored. Returns `None` if the leading
/// date-time cannot be parsed.
#[must_use]
pub fn parse_timestamp(input: &str) -> Option<i64> {
    match NaiveDateTime::parse_and_remainder(input.trim(), INPUT_FORMAT) {
        Ok((datetime, _rest)) => Some(datetime.and_utc().timestamp_millis()),
        Err(err) => {
            debug!("Unparsable timestamp {:?}: {}", input, err);
            None
        }
    }
}

/// Duration of a flight in whole minutes, or `None` when unknown.
///
/// Actual timestamps strictly dominate scheduled ones. A tier that yields a
/// negative span reports unknown rather than falling through.
#[must_use]
pub fn flight_duration_minutes(times: &FlightTimes) -> Option<i64> {
    times.signed_minutes().filter(|minutes| *minutes >= 0)
}

/// Render a duration as `"{h}h {m}m"`, or `"N/A"` when unknown or not positive.
#[must_use]
pub fn format_duration(minutes: Option<i64>) -> String {
    match minutes {
        Some(minutes) if minutes > 0 => format!("{}h {}m", minutes / 60, minutes % 60),
        _ => UNKNOWN_DISPLAY.to_string(),
    }
}

/// Duration display string for a snapshot.
#[must_use]
pub fn flight_time_display(flight: &Flight) -> String {
    format_duration(flight_duration_minutes(&FlightTimes::from_flight(flight)))
}

/// Reformat an upstream timestamp as e.g. `"Mar 05, 2024 14:30"`.
///
/// Input that does not parse is returned unchanged.
#[must_use]
pub fn format_date_time(input: &str) -> String {
    parse_timestamp(input)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || input.to_string(),
            |datetime| datetime.format(DISPLAY_FORMAT).to_string(),
        )
}
