//! Storage layer for flightstats.
//!
//! A `SQLite`-backed, append-mostly log of flight samples with route
//! aggregates and retention pruning. [`FlightStore`] is the async front door:
//! every call runs its SQL on a blocking thread and returns when the
//! statement has committed. Committed mutations are broadcast so that
//! [`RecordsSubscription`]s can re-query.

pub mod migrations;
pub mod queries;
pub mod schema;
pub mod subscription;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::{now_millis, FlightRecord, RouteInfo, RouteSummary};

pub use subscription::RecordsSubscription;

/// Default number of buffered change notifications per subscriber.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 16;

/// A committed mutation of `flight_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableChange {
    /// Rows were inserted or replaced.
    Upserted {
        /// Number of rows written.
        rows: usize,
    },
    /// Rows were removed by retention pruning.
    Pruned {
        /// Number of rows deleted.
        rows: usize,
    },
}

/// Handle to the flight record store.
///
/// Cheap to clone; clones share one connection and one change channel.
/// Writes are serialized by the connection lock and `SQLite`'s own
/// transactions.
#[derive(Debug, Clone)]
pub struct FlightStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    conn: Mutex<Connection>,
    changes: broadcast::Sender<TableChange>,
}

impl Inner {
    fn notify(&self, change: TableChange) {
        // No receivers is not an error.
        let receivers = self.changes.send(change).unwrap_or(0);
        debug!("Broadcast {:?} to {} subscribers", change, receivers);
    }
}

impl FlightStore {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories and initializes the schema as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_capacity(path, DEFAULT_SUBSCRIPTION_CAPACITY)
    }

    /// Open the store named by a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open_with_capacity(
            config.database_path(),
            config.storage.subscription_capacity,
        )
    }

    /// Open or create a store with a custom subscriber buffer size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening flight record database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Flight record database opened at {}", path.display());
        Ok(Self::from_connection(path, conn, capacity))
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self::from_connection(
            path,
            conn,
            DEFAULT_SUBSCRIPTION_CAPACITY,
        ))
    }

    fn from_connection(path: PathBuf, conn: Connection, capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                path,
                conn: Mutex::new(conn),
                changes,
            }),
        }
    }

    /// Path to the database file, `:memory:` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Run `f` against the connection on a blocking thread.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.conn.lock().map_err(|_| Error::LockPoisoned)?;
            f(&mut *conn)
        })
        .await?
    }

    /// Run a mutation on a blocking thread and broadcast its change.
    ///
    /// The change is sent from the blocking thread after `f` commits and
    /// before the connection lock is released, so it is delivered even if the
    /// calling future is dropped mid-flight.
    async fn with_write<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<(T, Option<TableChange>)> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut conn = inner.conn.lock().map_err(|_| Error::LockPoisoned)?;
            let (value, change) = f(&mut *conn)?;
            if let Some(change) = change {
                inner.notify(change);
            }
            Ok(value)
        })
        .await?
    }

    /// Insert a record, replacing any existing row with the same flight
    /// number and record date. Returns the row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, record: FlightRecord) -> Result<i64> {
        self.with_write(move |conn| {
            let id = queries::upsert(conn, &record)?;
            Ok((id, Some(TableChange::Upserted { rows: 1 })))
        })
        .await
    }

    /// Insert several records in one transaction. Returns the number written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; no rows are written then.
    pub async fn insert_many(&self, records: Vec<FlightRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        self.with_write(move |conn| {
            let rows = queries::upsert_many(conn, &records)?;
            Ok((rows, Some(TableChange::Upserted { rows })))
        })
        .await
    }

    /// Most recent record for a flight number, by `record_date`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn latest_record(&self, flight_number: &str) -> Result<Option<FlightRecord>> {
        let flight_number = flight_number.to_string();
        self.with_conn(move |conn| queries::latest_for_flight(conn, &flight_number))
            .await
    }

    /// All records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn all_records(&self) -> Result<Vec<FlightRecord>> {
        self.with_conn(|conn| queries::all_records(conn)).await
    }

    /// Subscribe to the full record list.
    ///
    /// The subscription yields the current snapshot first, then a fresh one
    /// after every committed insert or delete.
    #[must_use]
    pub fn subscribe_all(&self) -> RecordsSubscription {
        RecordsSubscription::new(self)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.changes.receiver_count()
    }

    /// Mean duration for a route over rows with `record_date >= since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn average_duration(&self, route: &RouteInfo, since: i64) -> Result<Option<i64>> {
        let route = route.clone();
        self.with_conn(move |conn| queries::average_duration(conn, &route, since))
            .await
    }

    /// Rows for a route with `record_date >= since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn flight_count_since(&self, route: &RouteInfo, since: i64) -> Result<i64> {
        let route = route.clone();
        self.with_conn(move |conn| queries::flight_count_since(conn, &route, since))
            .await
    }

    /// Rows for a route over all time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn flight_count(&self, route: &RouteInfo) -> Result<i64> {
        let route = route.clone();
        self.with_conn(move |conn| queries::flight_count(conn, &route))
            .await
    }

    /// Average and count for a route since `since`, read together.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn route_summary(&self, route: &RouteInfo, since: i64) -> Result<RouteSummary> {
        let route = route.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let average_minutes = queries::average_duration(&tx, &route, since)?;
            let flight_count = queries::flight_count_since(&tx, &route, since)?;
            tx.commit()?;
            Ok(RouteSummary {
                route,
                since,
                average_minutes,
                flight_count,
            })
        })
        .await
    }

    /// Distinct (departure, arrival) pairs across all rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn distinct_routes(&self) -> Result<Vec<RouteInfo>> {
        self.with_conn(|conn| queries::distinct_routes(conn)).await
    }

    /// Delete every row with `record_date < cutoff`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn prune(&self, cutoff: i64) -> Result<()> {
        self.with_write(move |conn| {
            let rows = queries::delete_before(conn, cutoff)?;
            Ok(((), (rows > 0).then_some(TableChange::Pruned { rows })))
        })
        .await
    }

    /// Delete rows recorded more than `max_age` ago.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn prune_older_than(&self, max_age: Duration) -> Result<()> {
        let age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        self.prune(now_millis().saturating_sub(age_ms)).await
    }

    /// Total rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn record_count(&self) -> Result<i64> {
        self.with_conn(|conn| queries::count(conn)).await
    }

    /// Store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn stats(&self) -> Result<StoreStats> {
        let mut stats = self.with_conn(|conn| queries::stats(conn)).await?;

        stats.db_size_bytes = if self.inner.path.as_os_str() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.inner.path).map_or(0, |m| m.len())
        };
        Ok(stats)
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total rows.
    pub total_records: i64,
    /// Distinct routes.
    pub route_count: i64,
    /// Earliest `record_date`.
    pub oldest_record_date: Option<i64>,
    /// Latest `record_date`.
    pub newest_record_date: Option<i64>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flightstats_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn create_test_store() -> FlightStore {
        init_test_logging();
        FlightStore::open_in_memory().expect("failed to create test store")
    }

    fn lhr_jfk(flight_number: &str, record_date: i64) -> FlightRecord {
        FlightRecord::new(flight_number, "LHR", "JFK", record_date)
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_and_latest() {
        let store = create_test_store();
        store.insert(lhr_jfk("BA117", 100)).await.unwrap();
        store.insert(lhr_jfk("BA117", 200)).await.unwrap();

        let latest = store.latest_record("BA117").await.unwrap().unwrap();
        assert_eq!(latest.record_date, 200);
        assert!(store.latest_record("VS3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_per_key() {
        let store = create_test_store();
        let record = lhr_jfk("BA117", 100).with_flight_time(420);

        let first = store.insert(record.clone()).await.unwrap();
        let second = store.insert(record).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.record_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_many() {
        let store = create_test_store();
        let written = store
            .insert_many(vec![lhr_jfk("BA117", 100), lhr_jfk("VS3", 100)])
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.insert_many(Vec::new()).await.unwrap(), 0);
        assert_eq!(store.all_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_route_queries() {
        let store = create_test_store();
        let route = RouteInfo::new("LHR", "JFK");
        store
            .insert_many(vec![
                lhr_jfk("BA117", 100).with_flight_time(60),
                lhr_jfk("BA117", 200).with_flight_time(90),
                lhr_jfk("BA117", 300),
                FlightRecord::new("BA118", "JFK", "LHR", 300).with_flight_time(400),
            ])
            .await
            .unwrap();

        assert_eq!(store.average_duration(&route, 0).await.unwrap(), Some(75));
        assert_eq!(store.flight_count_since(&route, 200).await.unwrap(), 2);
        assert_eq!(store.flight_count(&route).await.unwrap(), 3);
        assert_eq!(store.distinct_routes().await.unwrap().len(), 2);

        let summary = store.route_summary(&route, 150).await.unwrap();
        assert_eq!(summary.average_minutes, Some(90));
        assert_eq!(summary.flight_count, 2);
        assert_eq!(summary.since, 150);
    }

    #[tokio::test]
    async fn test_empty_queries_are_not_errors() {
        let store = create_test_store();
        let route = RouteInfo::new("CDG", "NCE");

        assert!(store.all_records().await.unwrap().is_empty());
        assert_eq!(store.average_duration(&route, 0).await.unwrap(), None);
        assert_eq!(store.flight_count(&route).await.unwrap(), 0);
        assert!(store.distinct_routes().await.unwrap().is_empty());
        store.prune(i64::MAX).await.unwrap();
    }

    #[tokio::test]
    async fn test_prune_keeps_cutoff_and_newer() {
        let store = create_test_store();
        store
            .insert_many(vec![
                lhr_jfk("BA117", 100),
                lhr_jfk("BA117", 200),
                lhr_jfk("BA117", 300),
            ])
            .await
            .unwrap();

        store.prune(200).await.unwrap();

        let dates: Vec<i64> = store
            .all_records()
            .await
            .unwrap()
            .iter()
            .map(|r| r.record_date)
            .collect();
        assert_eq!(dates, vec![300, 200]);
    }

    #[tokio::test]
    async fn test_prune_older_than() {
        let store = create_test_store();
        let now = now_millis();
        store.insert(lhr_jfk("BA117", now)).await.unwrap();
        store
            .insert(lhr_jfk("BA117", now - 10 * 24 * 60 * 60 * 1000))
            .await
            .unwrap();

        store
            .prune_older_than(Duration::from_secs(24 * 60 * 60))
            .await
            .unwrap();

        let remaining = store.all_records().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].record_date, now);
    }

    #[tokio::test]
    async fn test_stats_in_memory() {
        let store = create_test_store();
        store.insert(lhr_jfk("BA117", 100)).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_records, 1);
        assert_eq!(stats.route_count, 1);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_open_file_based_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("flightstats_store_{}", std::process::id()));
        let db_path = root.join("nested").join("records.db");
        let _ = std::fs::remove_dir_all(&root);

        let store = FlightStore::open(&db_path).unwrap();
        store.insert(lhr_jfk("BA117", 100)).await.unwrap();
        assert_eq!(store.path(), db_path);
        assert!(db_path.exists());

        let stats = store.stats().await.unwrap();
        assert!(stats.db_size_bytes > 0);

        drop(store);
        let reopened = FlightStore::open(&db_path).unwrap();
        assert_eq!(reopened.record_count().await.unwrap(), 1);

        drop(reopened);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = create_test_store();
        let other = store.clone();
        other.insert(lhr_jfk("BA117", 100)).await.unwrap();
        assert_eq!(store.record_count().await.unwrap(), 1);
    }

    #[test]
    fn test_open_directory_reports_error() {
        let dir = scratch_dir("open_dir");

        let err = FlightStore::open(&dir).unwrap_err();
        assert!(matches!(err, Error::DatabaseOpen { .. }));
        assert!(err.is_storage_error());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_open_newer_schema_reports_error() {
        let dir = scratch_dir("newer_schema");
        let db_path = dir.join("records.db");

        drop(FlightStore::open(&db_path).unwrap());
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "UPDATE metadata SET value = '99' WHERE key = 'schema_version'",
            [],
        )
        .unwrap();
        drop(conn);

        let err = FlightStore::open(&db_path).unwrap_err();
        assert!(matches!(err, Error::DatabaseMigration { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_query_failure_reaches_caller() {
        let store = create_test_store();
        store
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE flight_records")?;
                Ok(())
            })
            .await
            .unwrap();

        let err = store.all_records().await.unwrap_err();
        assert!(matches!(err, Error::DatabaseQuery(_)));
        let err = store.insert(lhr_jfk("BA117", 100)).await.unwrap_err();
        assert!(err.is_storage_error());
    }
}
