//! [`CommandAdapter`] implementation for the SQLite backend.

use crate::core::{
    BoxedCommand, CommandAdapter, ResponseBuilder, SchemaProvider, TableDescriptor,
    VALUE_SEPARATOR,
};
use crate::error::{StorageResult, ValidationError};
use crate::types::{
    DataParameter, Dataset, InstanceMetadata, InternalKey, MatchingCondition, ObjectId,
    QueryLevel, QueryOptions, SeriesId, StudyId,
};

use super::backend::{SqliteBackend, SqliteConnection};
use super::commands::{
    DeleteCommand, InsertCommand, InstanceMetadataCommand, KeyQueryCommand,
    MetadataQueryCommand, RowInsert, SelectCommand, UpdateMetadataCommand,
};
use super::query_builder::{Hierarchy, build_select, uid_column};
use super::schema::{METADATA_COLUMN, METADATA_UPDATED_COLUMN};

impl SqliteBackend {
    fn metadata_query(&self, level: QueryLevel, uids: &[&str]) -> StorageResult<MetadataQueryCommand> {
        let schema = self.standard_schema();
        let full = Hierarchy::down_to(schema, QueryLevel::Instance)?;
        let filter = Hierarchy::down_to(schema, level)?.identifier_filter(uids)?;
        let instance = full.target()?;

        let sql = format!(
            "SELECT {t}.{m} FROM {from} WHERE ({filter}) AND {t}.{m} IS NOT NULL ORDER BY {t}.{key}",
            t = instance.name,
            m = METADATA_COLUMN,
            from = full.from_clause()?,
            filter = filter.sql,
            key = instance.key_column,
        );
        Ok(MetadataQueryCommand::new(sql, filter.params))
    }

    fn key_query(&self, level: QueryLevel, uids: &[&str]) -> StorageResult<KeyQueryCommand> {
        let hierarchy = Hierarchy::down_to(self.standard_schema(), level)?;
        let filter = hierarchy.identifier_filter(uids)?;
        let target = hierarchy.target()?;

        let sql = format!(
            "SELECT {}.{} FROM {} WHERE {}",
            target.name,
            target.key_column,
            hierarchy.from_clause()?,
            filter.sql
        );
        Ok(KeyQueryCommand::new(sql, filter.params))
    }

    fn delete(&self, level: QueryLevel, key: InternalKey) -> StorageResult<DeleteCommand> {
        let table = self.standard_schema().query_table(level)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name, table.key_column);
        Ok(DeleteCommand::new(sql, key))
    }

    fn row_insert(
        table: &TableDescriptor,
        parameters: &[DataParameter],
        metadata: Option<String>,
    ) -> StorageResult<RowInsert> {
        let uid_col = uid_column(table)?;
        let keyword = uid_col.tag.keyword().unwrap_or(&uid_col.name);
        let uid = parameters
            .iter()
            .find(|p| p.tag == uid_col.tag)
            .and_then(DataParameter::first)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ValidationError::MissingRequiredAttribute {
                keyword: keyword.to_string(),
            })?;

        let separator = VALUE_SEPARATOR.to_string();
        let values = table
            .columns
            .iter()
            .filter_map(|column| {
                parameters
                    .iter()
                    .find(|p| p.tag == column.tag)
                    .map(|p| (column.name.clone(), p.values.join(&separator)))
            })
            .collect();

        Ok(RowInsert {
            table: table.name.clone(),
            key_column: table.key_column.clone(),
            uid_column: uid_col.name.clone(),
            uid_keyword: keyword.to_string(),
            uid: uid.to_string(),
            parent_key_column: table.parent_key_column.clone(),
            values,
            metadata,
        })
    }
}

impl CommandAdapter for SqliteBackend {
    fn create_select_command(
        &self,
        table: &TableDescriptor,
        conditions: &[MatchingCondition],
        options: Option<&QueryOptions>,
        response_builder: Box<dyn ResponseBuilder>,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Vec<Dataset>>> {
        let query = build_select(self.standard_schema(), table, conditions, options)?;
        Ok(Box::new(SelectCommand::new(query, response_builder)))
    }

    fn create_insert_command(
        &self,
        parameters: &[DataParameter],
        metadata: Option<&InstanceMetadata>,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        let schema = self.standard_schema();
        let metadata = metadata.map(InstanceMetadata::to_json).transpose()?;

        let mut rows = Vec::with_capacity(QueryLevel::ALL.len());
        for level in QueryLevel::ALL {
            let table = schema.query_table(level)?;
            let row_metadata = if level == QueryLevel::Instance {
                metadata.clone()
            } else {
                None
            };
            rows.push(Self::row_insert(table, parameters, row_metadata)?);
        }

        let mapped = rows.iter().map(|r| r.values.len()).sum::<usize>();
        if mapped < parameters.len() {
            tracing::debug!(
                unmapped = parameters.len() - mapped,
                "parameters without a column are not stored"
            );
        }
        Ok(Box::new(InsertCommand::new(rows)))
    }

    fn create_get_study_metadata_command(
        &self,
        study: &StudyId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Vec<InstanceMetadata>>> {
        let command = self.metadata_query(QueryLevel::Study, &[study.study_instance_uid()])?;
        Ok(Box::new(command))
    }

    fn create_get_series_metadata_command(
        &self,
        series: &SeriesId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Vec<InstanceMetadata>>> {
        let command = self.metadata_query(
            QueryLevel::Series,
            &[series.study_instance_uid(), series.series_instance_uid()],
        )?;
        Ok(Box::new(command))
    }

    fn create_get_instance_metadata_command(
        &self,
        object: &ObjectId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InstanceMetadata>>> {
        let command = self.metadata_query(QueryLevel::Instance, &object_uids(object))?;
        Ok(Box::new(InstanceMetadataCommand::new(command)))
    }

    fn create_update_metadata_command(
        &self,
        object: &ObjectId,
        metadata: &InstanceMetadata,
    ) -> StorageResult<BoxedCommand<SqliteConnection, bool>> {
        let hierarchy = Hierarchy::down_to(self.standard_schema(), QueryLevel::Instance)?;
        let filter = hierarchy.identifier_filter(&object_uids(object))?;
        let instance = hierarchy.target()?;

        let sql = format!(
            "UPDATE {t} SET {m} = ?, {u} = ? WHERE {key} IN \
             (SELECT {t}.{key} FROM {from} WHERE {filter})",
            t = instance.name,
            m = METADATA_COLUMN,
            u = METADATA_UPDATED_COLUMN,
            key = instance.key_column,
            from = hierarchy.from_clause()?,
            filter = filter.sql,
        );
        Ok(Box::new(UpdateMetadataCommand::new(
            sql,
            metadata.to_json()?,
            filter.params,
        )))
    }

    fn create_select_study_key_command(
        &self,
        study: &StudyId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InternalKey>>> {
        Ok(Box::new(
            self.key_query(QueryLevel::Study, &[study.study_instance_uid()])?,
        ))
    }

    fn create_select_series_key_command(
        &self,
        series: &SeriesId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InternalKey>>> {
        Ok(Box::new(self.key_query(
            QueryLevel::Series,
            &[series.study_instance_uid(), series.series_instance_uid()],
        )?))
    }

    fn create_select_instance_key_command(
        &self,
        object: &ObjectId,
    ) -> StorageResult<BoxedCommand<SqliteConnection, Option<InternalKey>>> {
        Ok(Box::new(
            self.key_query(QueryLevel::Instance, &object_uids(object))?,
        ))
    }

    fn create_delete_study_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        Ok(Box::new(self.delete(QueryLevel::Study, key)?))
    }

    fn create_delete_series_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        Ok(Box::new(self.delete(QueryLevel::Series, key)?))
    }

    fn create_delete_instance_command(
        &self,
        key: InternalKey,
    ) -> StorageResult<BoxedCommand<SqliteConnection, u64>> {
        Ok(Box::new(self.delete(QueryLevel::Instance, key)?))
    }
}

fn object_uids(object: &ObjectId) -> [&str; 3] {
    [
        object.study_instance_uid(),
        object.series_instance_uid(),
        object.sop_instance_uid(),
    ]
}
