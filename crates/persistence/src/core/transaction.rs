//! Transaction scoping for multi-command operations.

use crate::error::StorageResult;

use super::backend::ArchiveBackend;

/// A connection with an open transaction.
///
/// The scope is finished with [`commit`](Self::commit),
/// [`rollback`](Self::rollback) or [`finish`](Self::finish). Dropping an
/// unfinished scope drops the connection, which the backend must treat as a
/// rollback.
///
/// # Example
///
/// ```ignore
/// let mut tx = TransactionScope::begin(adapter).await?;
/// let outcome = run_commands(tx.connection()).await;
/// tx.finish(outcome).await
/// ```
pub struct TransactionScope<'a, B: ArchiveBackend> {
    backend: &'a B,
    conn: B::Connection,
    finished: bool,
}

impl<'a, B: ArchiveBackend> TransactionScope<'a, B> {
    /// Acquires a connection and begins a transaction on it.
    pub async fn begin(backend: &'a B) -> StorageResult<Self> {
        let mut conn = backend.acquire().await?;
        backend.begin(&mut conn).await?;
        Ok(Self {
            backend,
            conn,
            finished: false,
        })
    }

    /// Returns the connection the transaction runs on.
    pub fn connection(&mut self) -> &mut B::Connection {
        &mut self.conn
    }

    /// Commits the transaction. If the commit fails the transaction is rolled
    /// back and the commit error returned.
    pub async fn commit(mut self) -> StorageResult<()> {
        self.finished = true;
        if let Err(e) = self.backend.commit(&mut self.conn).await {
            self.rollback_quietly().await;
            return Err(e);
        }
        Ok(())
    }

    /// Rolls back the transaction.
    pub async fn rollback(mut self) -> StorageResult<()> {
        self.finished = true;
        self.backend.rollback(&mut self.conn).await
    }

    /// Commits if `outcome` is a success and rolls back otherwise, returning
    /// `outcome`. A failed rollback is logged and does not mask the original
    /// error.
    pub async fn finish<T>(mut self, outcome: StorageResult<T>) -> StorageResult<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(e) => {
                self.finished = true;
                self.rollback_quietly().await;
                Err(e)
            }
        }
    }

    async fn rollback_quietly(&mut self) {
        if let Err(e) = self.backend.rollback(&mut self.conn).await {
            tracing::warn!(backend = self.backend.name(), error = %e, "rollback failed");
        }
    }
}

impl<B: ArchiveBackend> Drop for TransactionScope<'_, B> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                backend = self.backend.name(),
                "transaction scope dropped without commit or rollback"
            );
        }
    }
}
