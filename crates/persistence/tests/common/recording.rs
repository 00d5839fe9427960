//! An adapter wrapper that records command construction.
//!
//! [`RecordingAdapter`] delegates to a SQLite backend, remembers the name of
//! every `create_*` call, and can be told to make one kind of command fail
//! when executed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pacs_persistence::backends::sqlite::{SqliteBackend, SqliteConnection};
use pacs_persistence::core::{
    ArchiveBackend, BoxedCommand, Command, CommandAdapter, ResponseBuilder, TableDescriptor,
};
use pacs_persistence::error::{BackendError, StorageResult};
use pacs_persistence::types::{
    DataParameter, Dataset, InstanceMetadata, InternalKey, MatchingCondition, ObjectId,
    QueryOptions, SeriesId, StudyId,
};

/// Delegating adapter that records which commands were created.
#[derive(Debug)]
pub struct RecordingAdapter {
    inner: Arc<SqliteBackend>,
    calls: Mutex<Vec<&'static str>>,
    failing: Option<&'static str>,
}

impl RecordingAdapter {
    pub fn new(inner: Arc<SqliteBackend>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failing: None,
        }
    }

    /// Makes commands created by `method` fail when executed.
    pub fn failing_on(mut self, method: &'static str) -> Self {
        self.failing = Some(method);
        self
    }

    /// Returns the recorded `create_*` calls in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns true if `method` was called.
    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|c| *c == method)
    }

    fn record<T: Send + 'static>(
        &self,
        method: &'static str,
        command: StorageResult<BoxedCommand<SqliteConnection, T>>,
    ) -> StorageResult<BoxedCommand<SqliteConnection, T>> {
        self.calls.lock().unwrap().push(method);
        let command = command?;
        if self.failing == Some(method) {
            Ok(Box::new(FailingCommand { inner: command }))
        } else {
            Ok(command)
        }
    }
}

/// A command that fails instead of executing.
struct FailingCommand<T> {
    inner: BoxedCommand<SqliteConnection, T>,
}

#[async_trait]
impl<T: Send + 'static> Command<SqliteConnection> for FailingCommand<T> {
    type Output = T;

    async fn execute(&mut self, _conn: &mut SqliteConnection) -> StorageResult<bool> {
        Err(BackendError::QueryError {
            message: "injected failure".to_string(),
        }
        .into())
    }

    fn into_result(self: Box<Self>) -> T {
        self.inner.into_result()
    }
}

#[async_trait]
impl ArchiveBackend for RecordingAdapter {
    type Connection = SqliteConnection;

    fn name(&self) -> &'static str {
        "recording"
    }

    async fn acquire(&self) -> StorageResult<SqliteConnection> {
        self.inner.acquire().await
    }

    async fn begin(&self, conn: &mut SqliteConnection) -> StorageResult<()> {
        self.inner.begin(conn).await
    }

    async fn commit(&self, conn: &mut SqliteConnection) -> StorageResult<()> {
        self.inner.commit(conn).await
    }

    async fn rollback(&self, conn: &mut SqliteConnection) -> StorageResult<()> {
        self.inner.rollback(conn).await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }

    async fn initialize(&self) -> StorageResult<()> {
        self.inner.initialize().await
    }
}

impl CommandAdapter for RecordingAdapter {
    fn create_select_command(
        &self,
        table: &TableDescriptor,
        conditions: &[MatchingCondition],
        options: Option<&QueryOptions>,
        response_builder: Box<dyn ResponseBuilder>,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Vec<Dataset>>> {
        self.record(
            "create_select_command",
            self.inner
                .create_select_command(table, conditions, options, response_builder),
        )
    }

    fn create_insert_command(
        &self,
        parameters: &[DataParameter],
        metadata: Option<&InstanceMetadata>,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        self.record(
            "create_insert_command",
            self.inner.create_insert_command(parameters, metadata),
        )
    }

    fn create_get_study_metadata_command(
        &self,
        study: &StudyId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Vec<InstanceMetadata>>> {
        self.record(
            "create_get_study_metadata_command",
            self.inner.create_get_study_metadata_command(study),
        )
    }

    fn create_get_series_metadata_command(
        &self,
        series: &SeriesId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Vec<InstanceMetadata>>> {
        self.record(
            "create_get_series_metadata_command",
            self.inner.create_get_series_metadata_command(series),
        )
    }

    fn create_get_instance_metadata_command(
        &self,
        object: &ObjectId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InstanceMetadata>>> {
        self.record(
            "create_get_instance_metadata_command",
            self.inner.create_get_instance_metadata_command(object),
        )
    }

    fn create_update_metadata_command(
        &self,
        object: &ObjectId,
        metadata: &InstanceMetadata,
    ) -> StorageResult<BoxedCommand<SqliteConnection, bool>> {
        self.record(
            "create_update_metadata_command",
            self.inner.create_update_metadata_command(object, metadata),
        )
    }

    fn create_select_study_key_command(
        &self,
        study: &StudyId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InternalKey>>> {
        self.record(
            "create_select_study_key_command",
            self.inner.create_select_study_key_command(study),
        )
    }

    fn create_select_series_key_command(
        &self,
        series: &SeriesId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InternalKey>>> {
        self.record(
            "create_select_series_key_command",
            self.inner.create_select_series_key_command(series),
        )
    }

    fn create_select_instance_key_command(
        &self,
        object: &ObjectId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InternalKey>>> {
        self.record(
            "create_select_instance_key_command",
            self.inner.create_select_instance_key_command(object),
        )
    }

    fn create_delete_study_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        self.record(
            "create_delete_study_command",
            self.inner.create_delete_study_command(key),
        )
    }

    fn create_delete_series_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        self.record(
            "create_delete_series_command",
            self.inner.create_delete_series_command(key),
        )
    }

    fn create_delete_instance_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        self.record(
            "create_delete_instance_command",
            self.inner.create_delete_instance_command(key),
        )
    }
}
