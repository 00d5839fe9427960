//! SQLite backend implementation.

use std::fmt::Debug;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use crate::core::{ArchiveBackend, SchemaProvider, StandardSchema};
use crate::error::{
    BackendError, StorageError, StorageResult, TransactionError, ValidationError,
};

use super::schema;

const BACKEND_NAME: &str = "sqlite";

/// SQLite backend for the archive.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    config: SqliteBackendConfig,
    is_memory: bool,
    schema: Arc<StandardSchema>,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("config", &self.config)
            .field("is_memory", &self.is_memory)
            .finish_non_exhaustive()
    }
}

/// Configuration for the SQLite backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of idle connections.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in milliseconds.
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Enable WAL mode for better concurrency.
    #[serde(default = "default_true")]
    pub enable_wal: bool,

    /// Enable foreign key constraints. Cascading deletes depend on them.
    #[serde(default = "default_true")]
    pub enable_foreign_keys: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout_ms() -> u64 {
    30000
}

fn default_busy_timeout_ms() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

impl SqliteBackend {
    /// Creates a new in-memory SQLite backend.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(":memory:", SqliteBackendConfig::default())
    }

    /// Opens or creates a file-based SQLite database.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Creates a backend with custom configuration.
    ///
    /// An in-memory database lives in a single pooled connection that is never
    /// recycled, so every operation sees the same data.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> StorageResult<Self> {
        if config.max_connections == 0 {
            return Err(ValidationError::OutOfRange {
                parameter: "max_connections".to_string(),
                value: "0".to_string(),
                message: "pool needs at least one connection".to_string(),
            }
            .into());
        }

        let path_str = path.as_ref().to_string_lossy();
        let is_memory = path_str == ":memory:";

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let foreign_keys = config.enable_foreign_keys;
        let wal = config.enable_wal && !is_memory;

        let manager = if is_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path.as_ref())
        };
        let manager = manager.with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            if foreign_keys {
                conn.pragma_update(None, "foreign_keys", true)?;
            }
            if wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            Ok(())
        });

        let mut builder = Pool::builder()
            .max_size(config.max_connections)
            .min_idle(Some(config.min_connections.min(config.max_connections)))
            .connection_timeout(Duration::from_millis(config.connection_timeout_ms));
        if is_memory {
            builder = builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = builder.build(manager).map_err(|e| {
            StorageError::Backend(BackendError::ConnectionFailed {
                backend_name: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })
        })?;

        tracing::debug!(path = %path_str, is_memory, "opened sqlite archive");

        Ok(Self {
            pool,
            config,
            is_memory,
            schema: Arc::new(StandardSchema::new()),
        })
    }

    /// Initialize the database schema.
    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::initialize_schema(&conn, self.schema.as_ref())
    }

    /// Get a connection from the pool. Times out after the configured
    /// connection timeout.
    pub(crate) fn get_connection(
        &self,
    ) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Returns whether this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.is_memory
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &SqliteBackendConfig {
        &self.config
    }

    /// Returns the schema the backend's tables are generated from.
    pub fn schema(&self) -> Arc<dyn SchemaProvider> {
        self.schema.clone()
    }

    pub(crate) fn standard_schema(&self) -> &StandardSchema {
        &self.schema
    }
}

/// Connection wrapper for SQLite.
///
/// A connection dropped with a transaction still open rolls it back before
/// returning to the pool.
pub struct SqliteConnection(PooledConnection<SqliteConnectionManager>);

impl Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl SqliteConnection {
    /// Returns true if a transaction is open on this connection.
    pub fn in_transaction(&self) -> bool {
        !self.0.is_autocommit()
    }
}

impl Deref for SqliteConnection {
    type Target = rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if self.in_transaction() {
            tracing::warn!("connection released inside a transaction, rolling back");
            if let Err(e) = self.0.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback on release failed");
            }
        }
    }
}

fn transaction_error(action: &str, e: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message: format!("Failed to {} transaction: {}", action, e),
        source: Some(Box::new(e)),
    })
}

#[async_trait]
impl ArchiveBackend for SqliteBackend {
    type Connection = SqliteConnection;

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn acquire(&self) -> StorageResult<Self::Connection> {
        Ok(SqliteConnection(self.get_connection()?))
    }

    async fn begin(&self, conn: &mut Self::Connection) -> StorageResult<()> {
        if conn.in_transaction() {
            return Err(TransactionError::NestedNotSupported.into());
        }
        conn.execute_batch("BEGIN IMMEDIATE").map_err(|e| {
            StorageError::Transaction(TransactionError::BeginFailed {
                message: e.to_string(),
            })
        })
    }

    async fn commit(&self, conn: &mut Self::Connection) -> StorageResult<()> {
        if !conn.in_transaction() {
            return Err(TransactionError::InvalidTransaction.into());
        }
        conn.execute_batch("COMMIT")
            .map_err(|e| transaction_error("commit", e))
    }

    async fn rollback(&self, conn: &mut Self::Connection) -> StorageResult<()> {
        if !conn.in_transaction() {
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")
            .map_err(|e| transaction_error("roll back", e))
    }

    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection().map_err(|_| {
            StorageError::Backend(BackendError::Unavailable {
                backend_name: BACKEND_NAME.to_string(),
                message: "Failed to get connection".to_string(),
            })
        })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    async fn initialize(&self) -> StorageResult<()> {
        self.init_schema()
    }
}
