//! Database driver abstraction.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::StorageResult;

/// A store the archive can run commands against.
///
/// The backend owns the connection pool and the transaction primitives. It
/// knows nothing about studies, series or instances; that knowledge lives in
/// the [`CommandAdapter`](super::CommandAdapter) built on top of it.
///
/// Connections are released by dropping them. A backend whose connections
/// can outlive an open transaction must roll that transaction back on drop so
/// that every exit path releases the connection cleanly.
///
/// # Example
///
/// ```ignore
/// use pacs_persistence::core::ArchiveBackend;
///
/// async fn ping<B: ArchiveBackend>(backend: &B) {
///     match backend.health_check().await {
///         Ok(()) => tracing::info!(backend = backend.name(), "healthy"),
///         Err(e) => tracing::warn!(backend = backend.name(), error = %e, "unhealthy"),
///     }
/// }
/// ```
#[async_trait]
pub trait ArchiveBackend: Send + Sync + Debug {
    /// The type of raw connection used by this backend.
    type Connection: Send;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;

    /// Acquires a connection from the pool.
    async fn acquire(&self) -> StorageResult<Self::Connection>;

    /// Starts a transaction on `conn`.
    async fn begin(&self, conn: &mut Self::Connection) -> StorageResult<()>;

    /// Commits the transaction open on `conn`.
    async fn commit(&self, conn: &mut Self::Connection) -> StorageResult<()>;

    /// Rolls back the transaction open on `conn`.
    async fn rollback(&self, conn: &mut Self::Connection) -> StorageResult<()>;

    /// Checks if the backend is healthy and accepting connections.
    async fn health_check(&self) -> StorageResult<()>;

    /// Initializes the database schema if needed.
    async fn initialize(&self) -> StorageResult<()>;
}
