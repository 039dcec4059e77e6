//! Synchronous SQL over a `flight_records` connection.
//!
//! [`FlightStore`](super::FlightStore) runs these on a blocking thread; they
//! are kept free of async so they can be tested directly against an
//! in-memory connection.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::error::Result;
use crate::record::{FlightRecord, RouteInfo};

use super::StoreStats;

const RECORD_COLUMNS: &str = r"
    id, flight_number, departure_airport, arrival_airport, record_date,
    scheduled_departure_time, scheduled_arrival_time,
    actual_departure_time, actual_arrival_time,
    departure_delay_minutes, arrival_delay_minutes, flight_time
";

const UPSERT_RECORD: &str = r"
INSERT INTO flight_records (
    flight_number, departure_airport, arrival_airport, record_date,
    scheduled_departure_time, scheduled_arrival_time,
    actual_departure_time, actual_arrival_time,
    departure_delay_minutes, arrival_delay_minutes, flight_time
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT (flight_number, record_date) DO UPDATE SET
    departure_airport = excluded.departure_airport,
    arrival_airport = excluded.arrival_airport,
    scheduled_departure_time = excluded.scheduled_departure_time,
    scheduled_arrival_time = excluded.scheduled_arrival_time,
    actual_departure_time = excluded.actual_departure_time,
    actual_arrival_time = excluded.actual_arrival_time,
    departure_delay_minutes = excluded.departure_delay_minutes,
    arrival_delay_minutes = excluded.arrival_delay_minutes,
    flight_time = excluded.flight_time
RETURNING id
";

/// Per-row duration in minutes; must agree with `FlightRecord::duration_minutes`.
const ROW_DURATION_MINUTES: &str = r"
CASE
    WHEN flight_time IS NOT NULL
        THEN flight_time
    WHEN actual_arrival_time IS NOT NULL AND actual_departure_time IS NOT NULL
        THEN (actual_arrival_time - actual_departure_time) / 60000
    WHEN scheduled_arrival_time IS NOT NULL AND scheduled_departure_time IS NOT NULL
        THEN ((scheduled_arrival_time + IFNULL(arrival_delay_minutes, 0) * 60000)
            - (scheduled_departure_time + IFNULL(departure_delay_minutes, 0) * 60000)) / 60000
    ELSE NULL
END
";

/// Insert a record, replacing any row with the same flight number and record date.
///
/// Returns the row id.
pub fn upsert(conn: &Connection, record: &FlightRecord) -> Result<i64> {
    let id: i64 = conn.query_row(
        UPSERT_RECORD,
        params![
            record.flight_number,
            record.departure_airport,
            record.arrival_airport,
            record.record_date,
            record.scheduled_departure_time,
            record.scheduled_arrival_time,
            record.actual_departure_time,
            record.actual_arrival_time,
            record.departure_delay_minutes,
            record.arrival_delay_minutes,
            record.flight_time,
        ],
        |row| row.get(0),
    )?;

    debug!(
        "Upserted flight record {} for {} at {}",
        id, record.flight_number, record.record_date
    );
    Ok(id)
}

/// Upsert several records in one transaction. Returns the number written.
pub fn upsert_many(conn: &mut Connection, records: &[FlightRecord]) -> Result<usize> {
    let tx = conn.transaction()?;
    for record in records {
        upsert(&tx, record)?;
    }
    tx.commit()?;
    Ok(records.len())
}

/// Most recent record for a flight number.
pub fn latest_for_flight(conn: &Connection, flight_number: &str) -> Result<Option<FlightRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM flight_records
         WHERE flight_number = ?1
         ORDER BY record_date DESC, id DESC LIMIT 1"
    );
    let record = conn
        .query_row(&sql, [flight_number], row_to_record)
        .optional()?;
    Ok(record)
}

/// Every record, newest first.
pub fn all_records(conn: &Connection) -> Result<Vec<FlightRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM flight_records ORDER BY record_date DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Mean row duration for a route since `since`, rounded to the nearest minute.
///
/// Rows without a derivable duration are left out. `None` when no row counts.
pub fn average_duration(conn: &Connection, route: &RouteInfo, since: i64) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT CAST(ROUND(AVG({ROW_DURATION_MINUTES})) AS INTEGER)
         FROM flight_records
         WHERE departure_airport = ?1 AND arrival_airport = ?2
         AND record_date >= ?3"
    );
    let average: Option<i64> = conn.query_row(
        &sql,
        params![route.departure_airport, route.arrival_airport, since],
        |row| row.get(0),
    )?;
    Ok(average)
}

/// Rows for a route since `since`.
pub fn flight_count_since(conn: &Connection, route: &RouteInfo, since: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        r"
        SELECT COUNT(*) FROM flight_records
        WHERE departure_airport = ?1 AND arrival_airport = ?2
        AND record_date >= ?3
        ",
        params![route.departure_airport, route.arrival_airport, since],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Rows for a route over all time, counted by flight number.
pub fn flight_count(conn: &Connection, route: &RouteInfo) -> Result<i64> {
    let count: i64 = conn.query_row(
        r"
        SELECT COUNT(flight_number) FROM flight_records
        WHERE departure_airport = ?1 AND arrival_airport = ?2
        ",
        params![route.departure_airport, route.arrival_airport],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Distinct routes, sorted by departure then arrival airport.
pub fn distinct_routes(conn: &Connection) -> Result<Vec<RouteInfo>> {
    let mut stmt = conn.prepare(
        r"
        SELECT DISTINCT departure_airport, arrival_airport FROM flight_records
        ORDER BY departure_airport, arrival_airport
        ",
    )?;
    let routes = stmt
        .query_map([], |row| Ok(RouteInfo::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(routes)
}

/// Delete rows with `record_date` strictly before `cutoff`. Returns the count removed.
pub fn delete_before(conn: &Connection, cutoff: i64) -> Result<usize> {
    let affected = conn.execute("DELETE FROM flight_records WHERE record_date < ?1", [cutoff])?;
    if affected > 0 {
        info!("Pruned {} flight records older than {}", affected, cutoff);
    }
    Ok(affected)
}

/// Total rows.
pub fn count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM flight_records", [], |row| row.get(0))?;
    Ok(count)
}

/// Row and route counts plus the record-date range. `db_size_bytes` is left at 0.
pub fn stats(conn: &Connection) -> Result<StoreStats> {
    let (total_records, oldest_record_date, newest_record_date): (i64, Option<i64>, Option<i64>) =
        conn.query_row(
            "SELECT COUNT(*), MIN(record_date), MAX(record_date) FROM flight_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
    let route_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM (SELECT DISTINCT departure_airport, arrival_airport FROM flight_records)",
        [],
        |row| row.get(0),
    )?;

    Ok(StoreStats {
        total_records,
        route_count,
        oldest_record_date,
        newest_record_date,
        db_size_bytes: 0,
    })
}

fn row_to_record(row: &Row) -> rusqlite::Result<FlightRecord> {
    Ok(FlightRecord {
        id: Some(row.get(0)?),
        flight_number: row.get(1)?,
        departure_airport: row.get(2)?,
        arrival_airport: row.get(3)?,
        record_date: row.get(4)?,
        scheduled_departure_time: row.get(5)?,
        scheduled_arrival_time: row.get(6)?,
        actual_departure_time: row.get(7)?,
        actual_arrival_time: row.get(8)?,
        departure_delay_minutes: row.get(9)?,
        arrival_delay_minutes: row.get(10)?,
        flight_time: row.get(11)?,
    })
}
