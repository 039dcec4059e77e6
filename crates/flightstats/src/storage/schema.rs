//! `SQLite` schema for the flight record store.

/// Flight samples. `(flight_number, record_date)` is the upsert key.
pub const CREATE_FLIGHT_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flight_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flight_number TEXT NOT NULL,
    departure_airport TEXT NOT NULL,
    arrival_airport TEXT NOT NULL,
    record_date INTEGER NOT NULL,
    scheduled_departure_time INTEGER,
    scheduled_arrival_time INTEGER,
    actual_departure_time INTEGER,
    actual_arrival_time INTEGER,
    departure_delay_minutes INTEGER,
    arrival_delay_minutes INTEGER,
    flight_time INTEGER,
    UNIQUE (flight_number, record_date)
)
";

/// Index for newest-first scans and retention pruning.
pub const CREATE_RECORD_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flight_records_record_date
ON flight_records(record_date DESC)
";

/// Index for route aggregates.
pub const CREATE_ROUTE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flight_records_route
ON flight_records(departure_airport, arrival_airport, record_date)
";

/// Key-value metadata, holds the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FLIGHT_RECORDS_TABLE,
    CREATE_RECORD_DATE_INDEX,
    CREATE_ROUTE_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_flight_records_table_has_upsert_key() {
        assert!(CREATE_FLIGHT_RECORDS_TABLE.contains("UNIQUE (flight_number, record_date)"));
        assert!(CREATE_FLIGHT_RECORDS_TABLE.contains("record_date INTEGER NOT NULL"));
        assert!(CREATE_FLIGHT_RECORDS_TABLE.contains("flight_time INTEGER,"));
    }
}
