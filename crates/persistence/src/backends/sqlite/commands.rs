//! Executable commands for the SQLite backend.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params_from_iter};

use crate::core::{Command, ResponseBuilder};
use crate::error::{StorageResult, ValidationError};
use crate::types::{Dataset, InstanceMetadata, InternalKey};

use super::backend::SqliteConnection;
use super::query_builder::{SelectQuery, SqlParam};
use super::schema::{METADATA_COLUMN, METADATA_UPDATED_COLUMN, STORED_AT_COLUMN};

/// Runs a compiled search and feeds each row to a response builder.
pub struct SelectCommand {
    query: SelectQuery,
    builder: Box<dyn ResponseBuilder>,
    total: Option<u64>,
}

impl SelectCommand {
    pub(crate) fn new(query: SelectQuery, builder: Box<dyn ResponseBuilder>) -> Self {
        Self {
            query,
            builder,
            total: None,
        }
    }
}

#[async_trait]
impl Command<SqliteConnection> for SelectCommand {
    type Output = Vec<Dataset>;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        let mut rows_read = 0usize;
        {
            let mut stmt = conn.prepare(&self.query.paged_sql())?;
            let mut rows = stmt.query(params_from_iter(self.query.paged_params()))?;
            while let Some(row) = rows.next()? {
                rows_read += 1;
                self.builder.begin_row();
                for (i, (level, column)) in self.query.columns.iter().enumerate() {
                    let value: Option<String> = row.get(i)?;
                    self.builder.read_column(*level, column, value.as_deref());
                }
                self.builder.end_row();
            }
        }

        if self.query.is_paged() {
            let total: i64 = conn.query_row(
                &self.query.count_sql,
                params_from_iter(self.query.params.iter()),
                |row| row.get(0),
            )?;
            self.total = Some(u64::try_from(total).unwrap_or(0));
        }

        tracing::debug!(
            level = %self.builder.level(),
            rows = rows_read,
            total = ?self.total,
            "select executed"
        );
        Ok(rows_read > 0)
    }

    fn total_count(&self) -> Option<u64> {
        self.total
    }

    fn into_result(self: Box<Self>) -> Vec<Dataset> {
        self.builder.into_response()
    }
}

/// One level's row of an instance insert.
#[derive(Debug, Clone)]
pub(crate) struct RowInsert {
    pub table: String,
    pub key_column: String,
    pub uid_column: String,
    pub uid_keyword: String,
    pub uid: String,
    pub parent_key_column: Option<String>,
    pub values: Vec<(String, String)>,
    pub metadata: Option<String>,
}

/// Inserts the study, series and instance rows of one instance, skipping rows
/// that already exist.
///
/// A series or instance row that already exists must belong to the parent
/// resolved for it; otherwise the insert fails with an identifier mismatch.
/// The output counts the instance row only.
pub struct InsertCommand {
    rows: Vec<RowInsert>,
    inserted: u64,
}

impl InsertCommand {
    pub(crate) fn new(rows: Vec<RowInsert>) -> Self {
        Self { rows, inserted: 0 }
    }

    fn object_id(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.uid.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl Command<SqliteConnection> for InsertCommand {
    type Output = u64;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        let stored_at = Utc::now().to_rfc3339();
        let mut parent_key: Option<i64> = None;

        for row in &self.rows {
            let mut columns: Vec<&str> = Vec::new();
            let mut params: Vec<SqlParam> = Vec::new();

            if let (Some(fk), Some(key)) = (&row.parent_key_column, parent_key) {
                columns.push(fk);
                params.push(SqlParam::integer(key));
            }
            for (name, value) in &row.values {
                columns.push(name);
                params.push(SqlParam::string(value));
            }
            if let Some(metadata) = &row.metadata {
                columns.push(METADATA_COLUMN);
                params.push(SqlParam::string(metadata));
                columns.push(METADATA_UPDATED_COLUMN);
                params.push(SqlParam::string(&stored_at));
            }
            columns.push(STORED_AT_COLUMN);
            params.push(SqlParam::string(&stored_at));

            let sql = format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
                row.table,
                columns.join(", "),
                vec!["?"; params.len()].join(", ")
            );
            let inserted = conn.execute(&sql, params_from_iter(params.iter()))? as u64;

            let key = match (&row.parent_key_column, parent_key) {
                (Some(fk), Some(expected)) => {
                    let (key, actual): (i64, i64) = conn.query_row(
                        &format!(
                            "SELECT {}, {} FROM {} WHERE {} = ?1",
                            row.key_column, fk, row.table, row.uid_column
                        ),
                        [&row.uid],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )?;
                    if actual != expected {
                        return Err(ValidationError::IdentifierMismatch {
                            keyword: row.uid_keyword.clone(),
                            value: row.uid.clone(),
                            object_id: self.object_id(),
                        }
                        .into());
                    }
                    key
                }
                _ => conn.query_row(
                    &format!(
                        "SELECT {} FROM {} WHERE {} = ?1",
                        row.key_column, row.table, row.uid_column
                    ),
                    [&row.uid],
                    |r| r.get(0),
                )?,
            };
            parent_key = Some(key);
            self.inserted = inserted;
        }

        tracing::debug!(created = self.inserted > 0, "insert executed");
        Ok(self.inserted > 0)
    }

    fn into_result(self: Box<Self>) -> u64 {
        self.inserted
    }
}

/// Reads the metadata column of every matching instance.
pub struct MetadataQueryCommand {
    sql: String,
    params: Vec<SqlParam>,
    results: Vec<InstanceMetadata>,
}

impl MetadataQueryCommand {
    pub(crate) fn new(sql: String, params: Vec<SqlParam>) -> Self {
        Self {
            sql,
            params,
            results: Vec::new(),
        }
    }
}

#[async_trait]
impl Command<SqliteConnection> for MetadataQueryCommand {
    type Output = Vec<InstanceMetadata>;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        let mut stmt = conn.prepare(&self.sql)?;
        let texts = stmt
            .query_map(params_from_iter(self.params.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for text in texts {
            self.results.push(InstanceMetadata::from_json(&text)?);
        }
        Ok(!self.results.is_empty())
    }

    fn into_result(self: Box<Self>) -> Vec<InstanceMetadata> {
        self.results
    }
}

/// Reads one instance's metadata.
pub struct InstanceMetadataCommand(MetadataQueryCommand);

impl InstanceMetadataCommand {
    pub(crate) fn new(inner: MetadataQueryCommand) -> Self {
        Self(inner)
    }
}

#[async_trait]
impl Command<SqliteConnection> for InstanceMetadataCommand {
    type Output = Option<InstanceMetadata>;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        self.0.execute(conn).await
    }

    fn into_result(self: Box<Self>) -> Option<InstanceMetadata> {
        self.0.results.into_iter().next()
    }
}

/// Replaces one instance's metadata.
pub struct UpdateMetadataCommand {
    sql: String,
    metadata: String,
    filter: Vec<SqlParam>,
    updated: bool,
}

impl UpdateMetadataCommand {
    pub(crate) fn new(sql: String, metadata: String, filter: Vec<SqlParam>) -> Self {
        Self {
            sql,
            metadata,
            filter,
            updated: false,
        }
    }
}

#[async_trait]
impl Command<SqliteConnection> for UpdateMetadataCommand {
    type Output = bool;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        let mut params = vec![
            SqlParam::string(&self.metadata),
            SqlParam::string(Utc::now().to_rfc3339()),
        ];
        params.extend(self.filter.iter().cloned());

        let changed = conn.execute(&self.sql, params_from_iter(params.iter()))?;
        self.updated = changed > 0;
        Ok(self.updated)
    }

    fn into_result(self: Box<Self>) -> bool {
        self.updated
    }
}

/// Resolves a public identifier to a surrogate key.
pub struct KeyQueryCommand {
    sql: String,
    params: Vec<SqlParam>,
    key: Option<InternalKey>,
}

impl KeyQueryCommand {
    pub(crate) fn new(sql: String, params: Vec<SqlParam>) -> Self {
        Self {
            sql,
            params,
            key: None,
        }
    }
}

#[async_trait]
impl Command<SqliteConnection> for KeyQueryCommand {
    type Output = Option<InternalKey>;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        self.key = conn
            .query_row(&self.sql, params_from_iter(self.params.iter()), |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .map(InternalKey::new);
        Ok(self.key.is_some())
    }

    fn into_result(self: Box<Self>) -> Option<InternalKey> {
        self.key
    }
}

/// Deletes one row by surrogate key. Children go with it through the
/// cascading foreign keys.
pub struct DeleteCommand {
    sql: String,
    key: InternalKey,
    affected: u64,
}

impl DeleteCommand {
    pub(crate) fn new(sql: String, key: InternalKey) -> Self {
        Self {
            sql,
            key,
            affected: 0,
        }
    }
}

#[async_trait]
impl Command<SqliteConnection> for DeleteCommand {
    type Output = u64;

    async fn execute(&mut self, conn: &mut SqliteConnection) -> StorageResult<bool> {
        self.affected = conn.execute(&self.sql, [self.key.value()])? as u64;
        tracing::debug!(key = %self.key, rows = self.affected, "delete executed");
        Ok(self.affected > 0)
    }

    fn into_result(self: Box<Self>) -> u64 {
        self.affected
    }
}
