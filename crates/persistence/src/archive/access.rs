//! The archive access orchestrator.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::core::{
    BoxedCommand, CommandAdapter, QueryResponseBuilderFactory, ResponseBuilder,
    ResponseBuilderFactory, SchemaProvider, TransactionScope,
};
use crate::error::{StorageError, StorageResult, ValidationError};
use crate::types::{
    DataParameter, Dataset, InstanceMetadata, InternalKey, MatchingCondition, ObjectId,
    PagedResult, QueryLevel, QueryOptions, SeriesId, StudyId, Tag, find_parameter, tag,
};

/// Result of storing an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The instance row was inserted.
    Created,
    /// The instance was stored already.
    Duplicate,
}

impl StoreOutcome {
    /// Returns true if the instance was newly stored.
    pub fn is_created(&self) -> bool {
        matches!(self, StoreOutcome::Created)
    }
}

/// Orchestrates archive operations over a [`CommandAdapter`].
///
/// Each operation resolves what it needs through the schema provider, asks the
/// adapter for commands and runs them in sequence on one connection. Single
/// command operations run on a plain connection; store and delete run inside a
/// [`TransactionScope`] so a failure part way through leaves the store unchanged.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use pacs_persistence::archive::ObjectArchiveAccess;
/// use pacs_persistence::backends::sqlite::SqliteBackend;
/// use pacs_persistence::types::{QueryLevel, QueryOptions};
///
/// let backend = Arc::new(SqliteBackend::in_memory()?);
/// backend.init_schema()?;
/// let archive = ObjectArchiveAccess::new(backend.clone(), backend.schema());
///
/// let page = archive
///     .search_paged(&[], Some(&QueryOptions::paged(10, 0)), QueryLevel::Study)
///     .await?;
/// println!("{} of {}", page.len(), page.total_count);
/// ```
pub struct ObjectArchiveAccess<A: CommandAdapter> {
    adapter: Arc<A>,
    schema: Arc<dyn SchemaProvider>,
    response_builders: Arc<dyn ResponseBuilderFactory>,
}

impl<A: CommandAdapter> Clone for ObjectArchiveAccess<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            schema: Arc::clone(&self.schema),
            response_builders: Arc::clone(&self.response_builders),
        }
    }
}

impl<A: CommandAdapter> std::fmt::Debug for ObjectArchiveAccess<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectArchiveAccess")
            .field("backend", &self.adapter.name())
            .field("schema", &self.schema)
            .field("response_builders", &self.response_builders)
            .finish()
    }
}

impl<A: CommandAdapter> ObjectArchiveAccess<A> {
    /// Creates an archive using the default response shaping.
    pub fn new(adapter: Arc<A>, schema: Arc<dyn SchemaProvider>) -> Self {
        let response_builders = Arc::new(QueryResponseBuilderFactory::new(Arc::clone(&schema)));
        Self::with_response_builders(adapter, schema, response_builders)
    }

    /// Creates an archive with a custom response builder strategy.
    pub fn with_response_builders(
        adapter: Arc<A>,
        schema: Arc<dyn SchemaProvider>,
        response_builders: Arc<dyn ResponseBuilderFactory>,
    ) -> Self {
        Self {
            adapter,
            schema,
            response_builders,
        }
    }

    /// Returns the command adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Returns the schema provider.
    pub fn schema(&self) -> &dyn SchemaProvider {
        self.schema.as_ref()
    }

    /// Creates the response builder for `level`.
    pub fn create_response_builder(
        &self,
        level: QueryLevel,
    ) -> StorageResult<Box<dyn ResponseBuilder>> {
        self.response_builders.create(level)
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Returns every dataset at `level` matching `conditions`.
    ///
    /// Without options, or with options lacking a limit, the search is
    /// unbounded.
    #[instrument(skip_all, fields(level = %level, conditions = conditions.len()))]
    pub async fn search(
        &self,
        conditions: &[MatchingCondition],
        options: Option<&QueryOptions>,
        level: QueryLevel,
    ) -> StorageResult<Vec<Dataset>> {
        let (rows, _) = self.select(conditions, options, level).await?;
        Ok(rows)
    }

    /// Returns one page of datasets at `level` matching `conditions`.
    ///
    /// Both `limit` and `offset` are required, and the limit must be positive.
    /// Both checks happen before anything touches the store. The total count is
    /// the backend's reported count when it computes one, otherwise the number
    /// of rows on the page.
    #[instrument(skip_all, fields(level = %level, conditions = conditions.len()))]
    pub async fn search_paged(
        &self,
        conditions: &[MatchingCondition],
        options: Option<&QueryOptions>,
        level: QueryLevel,
    ) -> StorageResult<PagedResult<Dataset>> {
        let (limit, offset) = validate_paging(options)?;
        let options = QueryOptions::paged(limit, offset);

        let (mut items, total) = self.select(conditions, Some(&options), level).await?;
        items.truncate(limit as usize);

        let returned = items.len() as u64;
        let total_count = match total {
            Some(total) => total.max(returned),
            None => returned,
        };
        debug!(returned, total_count, "paged search complete");

        Ok(PagedResult::new(items, offset, limit, total_count))
    }

    async fn select(
        &self,
        conditions: &[MatchingCondition],
        options: Option<&QueryOptions>,
        level: QueryLevel,
    ) -> StorageResult<(Vec<Dataset>, Option<u64>)> {
        let table = self.schema.query_table(level)?;
        let builder = self.create_response_builder(level)?;
        let mut command = self
            .adapter
            .create_select_command(table, conditions, options, builder)?;

        let mut conn = self.adapter.acquire().await?;
        command.execute(&mut conn).await?;
        let total = command.total_count();
        Ok((command.into_result(), total))
    }

    // ========================================================================
    // Store
    // ========================================================================

    /// Stores one instance, creating its study and series if needed.
    ///
    /// UID parameters missing from `parameters` are taken from `object_id`; a
    /// UID parameter that disagrees with it is rejected. When `metadata` is
    /// given it is written after the insert, also for an instance that was
    /// already stored. Insert and metadata update share one transaction.
    ///
    /// A series or instance UID that is already stored under another parent
    /// is rejected with [`ValidationError::IdentifierMismatch`].
    #[instrument(skip_all, fields(object = %object_id))]
    pub async fn store_instance(
        &self,
        object_id: &ObjectId,
        parameters: &[DataParameter],
        metadata: Option<&InstanceMetadata>,
    ) -> StorageResult<StoreOutcome> {
        let parameters = bind_identifiers(object_id, parameters)?;
        let insert = self.adapter.create_insert_command(&parameters, metadata)?;
        let update = match metadata {
            Some(metadata) => Some(
                self.adapter
                    .create_update_metadata_command(object_id, metadata)?,
            ),
            None => None,
        };

        let mut tx = TransactionScope::begin(self.adapter.as_ref()).await?;
        let result: StorageResult<u64> = async {
            let mut insert = insert;
            insert.execute(tx.connection()).await?;
            let inserted = insert.into_result();
            if let Some(mut update) = update {
                update.execute(tx.connection()).await?;
            }
            Ok(inserted)
        }
        .await;
        let inserted = tx.finish(result).await?;

        if inserted == 0 {
            warn!("instance already stored");
            Ok(StoreOutcome::Duplicate)
        } else {
            debug!("instance stored");
            Ok(StoreOutcome::Created)
        }
    }

    /// Replaces the metadata of a stored instance.
    ///
    /// Returns false if no such instance is stored. Storing identical metadata
    /// again succeeds.
    #[instrument(skip_all, fields(object = %object_id))]
    pub async fn store_instance_metadata(
        &self,
        object_id: &ObjectId,
        metadata: &InstanceMetadata,
    ) -> StorageResult<bool> {
        let command = self
            .adapter
            .create_update_metadata_command(object_id, metadata)?;
        let mut conn = self.adapter.acquire().await?;
        let updated = execute(command, &mut conn).await?;
        if !updated {
            debug!("no stored instance to update");
        }
        Ok(updated)
    }

    // ========================================================================
    // Metadata retrieval
    // ========================================================================

    /// Returns the metadata of every instance in a study.
    #[instrument(skip_all, fields(study = %study))]
    pub async fn get_study_metadata(&self, study: &StudyId) -> StorageResult<Vec<InstanceMetadata>> {
        let command = self.adapter.create_get_study_metadata_command(study)?;
        self.run(command).await
    }

    /// Returns the metadata of every instance in a series.
    #[instrument(skip_all, fields(series = %series))]
    pub async fn get_series_metadata(
        &self,
        series: &SeriesId,
    ) -> StorageResult<Vec<InstanceMetadata>> {
        let command = self.adapter.create_get_series_metadata_command(series)?;
        self.run(command).await
    }

    /// Returns the metadata of one instance, if it is stored and has any.
    #[instrument(skip_all, fields(object = %object_id))]
    pub async fn get_instance_metadata(
        &self,
        object_id: &ObjectId,
    ) -> StorageResult<Option<InstanceMetadata>> {
        let command = self.adapter.create_get_instance_metadata_command(object_id)?;
        self.run(command).await
    }

    /// Returns true if the instance is stored.
    #[instrument(skip_all, fields(object = %object_id))]
    pub async fn exists(&self, object_id: &ObjectId) -> StorageResult<bool> {
        let command = self.adapter.create_select_instance_key_command(object_id)?;
        Ok(self.run(command).await?.is_some())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Deletes a study with all of its series and instances.
    ///
    /// Fails with a not-found error if the study is not stored, without
    /// building the delete. Returns whether any row was removed.
    #[instrument(skip_all, fields(study = %study))]
    pub async fn delete_study(&self, study: &StudyId) -> StorageResult<bool> {
        let mut tx = TransactionScope::begin(self.adapter.as_ref()).await?;
        let result = async {
            let key = self.resolve_study_key(tx.connection(), study).await?;
            let command = self.adapter.create_delete_study_command(key)?;
            execute(command, tx.connection()).await
        }
        .await;
        tx.finish(result).await
    }

    /// Deletes a series with all of its instances.
    #[instrument(skip_all, fields(series = %series))]
    pub async fn delete_series(&self, series: &SeriesId) -> StorageResult<bool> {
        let mut tx = TransactionScope::begin(self.adapter.as_ref()).await?;
        let result = async {
            let key = self.resolve_series_key(tx.connection(), series).await?;
            let command = self.adapter.create_delete_series_command(key)?;
            execute(command, tx.connection()).await
        }
        .await;
        tx.finish(result).await
    }

    /// Deletes one instance.
    #[instrument(skip_all, fields(object = %object_id))]
    pub async fn delete_instance(&self, object_id: &ObjectId) -> StorageResult<bool> {
        let mut tx = TransactionScope::begin(self.adapter.as_ref()).await?;
        let result = async {
            let key = self.resolve_instance_key(tx.connection(), object_id).await?;
            let command = self.adapter.create_delete_instance_command(key)?;
            execute(command, tx.connection()).await
        }
        .await;
        tx.finish(result).await
    }

    // ========================================================================
    // Key resolution
    // ========================================================================

    async fn resolve_study_key(
        &self,
        conn: &mut A::Connection,
        study: &StudyId,
    ) -> StorageResult<InternalKey> {
        let command = self.adapter.create_select_study_key_command(study)?;
        resolved(command, conn, QueryLevel::Study, study.to_string()).await
    }

    async fn resolve_series_key(
        &self,
        conn: &mut A::Connection,
        series: &SeriesId,
    ) -> StorageResult<InternalKey> {
        let command = self.adapter.create_select_series_key_command(series)?;
        resolved(command, conn, QueryLevel::Series, series.to_string()).await
    }

    async fn resolve_instance_key(
        &self,
        conn: &mut A::Connection,
        object_id: &ObjectId,
    ) -> StorageResult<InternalKey> {
        let command = self.adapter.create_select_instance_key_command(object_id)?;
        resolved(command, conn, QueryLevel::Instance, object_id.to_string()).await
    }

    async fn run<T: Send>(&self, mut command: BoxedCommand<A::Connection, T>) -> StorageResult<T> {
        let mut conn = self.adapter.acquire().await?;
        command.execute(&mut conn).await?;
        Ok(command.into_result())
    }
}

async fn execute<C: Send, T: Send>(
    mut command: BoxedCommand<C, T>,
    conn: &mut C,
) -> StorageResult<bool> {
    command.execute(conn).await
}

async fn resolved<C: Send>(
    mut command: BoxedCommand<C, Option<InternalKey>>,
    conn: &mut C,
    level: QueryLevel,
    uid: String,
) -> StorageResult<InternalKey> {
    command.execute(conn).await?;
    command.into_result().ok_or_else(|| {
        debug!(level = %level, uid = %uid, "key resolution found no row");
        StorageError::not_found(level, uid)
    })
}

fn validate_paging(options: Option<&QueryOptions>) -> StorageResult<(u32, u32)> {
    let options = options.ok_or_else(|| invalid_argument("options", "paged search requires query options"))?;
    let limit = options
        .limit
        .ok_or_else(|| invalid_argument("limit", "paged search requires a limit"))?;
    let offset = options
        .offset
        .ok_or_else(|| invalid_argument("offset", "paged search requires an offset"))?;

    if limit == 0 {
        return Err(ValidationError::OutOfRange {
            parameter: "limit".to_string(),
            value: limit.to_string(),
            message: "limit must be greater than zero".to_string(),
        }
        .into());
    }
    Ok((limit, offset))
}

fn invalid_argument(parameter: &str, message: &str) -> StorageError {
    ValidationError::InvalidArgument {
        parameter: parameter.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Makes the three UID parameters agree with `object_id`.
fn bind_identifiers(
    object_id: &ObjectId,
    parameters: &[DataParameter],
) -> StorageResult<Vec<DataParameter>> {
    let identifiers: [(Tag, &str); 3] = [
        (tag::STUDY_INSTANCE_UID, object_id.study_instance_uid()),
        (tag::SERIES_INSTANCE_UID, object_id.series_instance_uid()),
        (tag::SOP_INSTANCE_UID, object_id.sop_instance_uid()),
    ];

    let mut bound: Vec<DataParameter> = parameters
        .iter()
        .filter(|p| !(p.values.is_empty() && identifiers.iter().any(|(t, _)| *t == p.tag)))
        .cloned()
        .collect();

    for (tag, expected) in identifiers {
        match find_parameter(&bound, tag) {
            Some(value) if value != expected => {
                return Err(ValidationError::IdentifierMismatch {
                    keyword: tag.keyword().unwrap_or_default().to_string(),
                    value: value.to_string(),
                    object_id: object_id.to_string(),
                }
                .into());
            }
            Some(_) => {}
            None => bound.push(DataParameter::single(tag, expected)),
        }
    }
    Ok(bound)
}
