//! Executable commands and the adapter that builds them.
//!
//! Every archive operation is expressed as one or more [`Command`]s created by
//! a [`CommandAdapter`] and executed on a connection acquired from it. The
//! orchestrator only sequences commands; it never sees SQL.

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::types::{
    DataParameter, Dataset, InstanceMetadata, InternalKey, MatchingCondition, ObjectId,
    QueryOptions, SeriesId, StudyId,
};

use super::backend::ArchiveBackend;
use super::response::ResponseBuilder;
use super::schema::TableDescriptor;

/// A single unit of work against a connection of type `C`.
#[async_trait]
pub trait Command<C: Send>: Send {
    /// The typed result of the command.
    type Output: Send;

    /// Runs the command. Returns whether it matched or affected anything.
    async fn execute(&mut self, conn: &mut C) -> StorageResult<bool>;

    /// Total number of matches ignoring paging, if the command computed it.
    fn total_count(&self) -> Option<u64> {
        None
    }

    /// Consumes the command, returning its result.
    fn into_result(self: Box<Self>) -> Self::Output;
}

/// A boxed command producing `T`.
pub type BoxedCommand<C, T> = Box<dyn Command<C, Output = T>>;

/// Builds the commands for every archive operation.
///
/// Construction is separate from execution: a command that is never executed
/// has no effect on the store.
pub trait CommandAdapter: ArchiveBackend {
    /// Creates a search over `table` returning datasets shaped by
    /// `response_builder`. Universal conditions constrain nothing.
    fn create_select_command(
        &self,
        table: &TableDescriptor,
        conditions: &[MatchingCondition],
        options: Option<&QueryOptions>,
        response_builder: Box<dyn ResponseBuilder>,
    ) -> StorageResult<BoxedCommand<Self::Connection, Vec<Dataset>>>;

    /// Creates the insert of one instance, and of its study and series when
    /// they are not stored yet. The output is the number of instance rows
    /// inserted: 1 for a new instance, 0 for one that was stored already.
    fn create_insert_command(
        &self,
        parameters: &[DataParameter],
        metadata: Option<&InstanceMetadata>,
    ) -> StorageResult<BoxedCommand<Self::Connection, u64>>;

    /// Creates a read of the metadata of every instance in a study.
    fn create_get_study_metadata_command(
        &self,
        study: &StudyId,
    ) -> StorageResult<BoxedCommand<Self::Connection, Vec<InstanceMetadata>>>;

    /// Creates a read of the metadata of every instance in a series.
    fn create_get_series_metadata_command(
        &self,
        series: &SeriesId,
    ) -> StorageResult<BoxedCommand<Self::Connection, Vec<InstanceMetadata>>>;

    /// Creates a read of one instance's metadata.
    fn create_get_instance_metadata_command(
        &self,
        object: &ObjectId,
    ) -> StorageResult<BoxedCommand<Self::Connection, Option<InstanceMetadata>>>;

    /// Creates the replacement of one instance's metadata. Executing it
    /// reports whether an instance row matched.
    fn create_update_metadata_command(
        &self,
        object: &ObjectId,
        metadata: &InstanceMetadata,
    ) -> StorageResult<BoxedCommand<Self::Connection, bool>>;

    /// Creates a lookup of a study's surrogate key.
    fn create_select_study_key_command(
        &self,
        study: &StudyId,
    ) -> StorageResult<BoxedCommand<Self::Connection, Option<InternalKey>>>;

    /// Creates a lookup of a series' surrogate key.
    fn create_select_series_key_command(
        &self,
        series: &SeriesId,
    ) -> StorageResult<BoxedCommand<Self::Connection, Option<InternalKey>>>;

    /// Creates a lookup of an instance's surrogate key.
    fn create_select_instance_key_command(
        &self,
        object: &ObjectId,
    ) -> StorageResult<BoxedCommand<Self::Connection, Option<InternalKey>>>;

    /// Creates the removal of a study and everything beneath it.
    fn create_delete_study_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<Self::Connection, u64>>;

    /// Creates the removal of a series and its instances.
    fn create_delete_series_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<Self::Connection, u64>>;

    /// Creates the removal of one instance.
    fn create_delete_instance_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<Self::Connection, u64>>;
}
