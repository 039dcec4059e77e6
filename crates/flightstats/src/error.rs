//! Error types for flightstats.
//!
//! Only storage, configuration and I/O faults are errors here. Missing or
//! malformed timestamps are resolved by the duration calculator and never
//! surface through this type.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightstats operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The shared connection lock was poisoned by a panicking writer.
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for flightstats operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if this error came from the storage engine.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::LockPoisoned
                | Self::TaskJoin(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::LockPoisoned;
        assert_eq!(err.to_string(), "database connection lock poisoned");

        let err = Error::config_validation("window_days must be greater than 0");
        assert_eq!(
            err.to_string(),
            "invalid configuration: window_days must be greater than 0"
        );
    }

    #[test]
    fn test_is_storage_error() {
        assert!(Error::LockPoisoned.is_storage_error());
        assert!(Error::DatabaseMigration {
            message: "bad".to_string()
        }
        .is_storage_error());
        assert!(!Error::config_validation("nope").is_storage_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert!(!err.is_storage_error());
    }

    #[test]
    fn test_from_rusqlite_error() {
        let sqlite_err = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        )
        .unwrap_err();
        let err: Error = sqlite_err.into();
        assert!(matches!(err, Error::DatabaseQuery(_)));
        assert!(err.is_storage_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("not valid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(!err.is_storage_error());
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }

    #[tokio::test]
    async fn test_from_join_error() {
        let handle = tokio::spawn(async { panic!("boom") });
        let join_err = handle.await.unwrap_err();
        let err: Error = join_err.into();
        assert!(matches!(err, Error::TaskJoin(_)));
        assert!(err.is_storage_error());
    }
}
