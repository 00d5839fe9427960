//! SQLite schema definitions and migrations.
//!
//! The level tables are generated from the schema provider's descriptors. Each
//! gets an integer surrogate key, a unique identifier column, one `TEXT`
//! column per attribute, and a cascading foreign key to its parent. The
//! instance table additionally stores the metadata JSON.

use rusqlite::Connection;

use crate::core::{SchemaProvider, TableDescriptor};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::QueryLevel;

use super::query_builder::{parent_key_column, uid_column};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Instance column holding the metadata JSON.
pub const METADATA_COLUMN: &str = "metadata";

/// Instance column holding the time the metadata was last written.
pub const METADATA_UPDATED_COLUMN: &str = "metadata_updated_at";

/// Column holding the time a row was inserted.
pub const STORED_AT_COLUMN: &str = "stored_at";

fn migration_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::MigrationError { message })
}

/// Initialize the database schema.
///
/// Safe to call on an initialized database.
pub fn initialize_schema(conn: &Connection, schema: &dyn SchemaProvider) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn, schema)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        tracing::info!(version = SCHEMA_VERSION, "created archive schema");
    } else if current_version > SCHEMA_VERSION {
        return Err(migration_error(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    } else {
        tracing::debug!(version = current_version, "archive schema up to date");
    }

    Ok(())
}

/// Get the current schema version.
pub fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| migration_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| migration_error(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| migration_error(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_schema_v1(conn: &Connection, schema: &dyn SchemaProvider) -> StorageResult<()> {
    for level in QueryLevel::ALL {
        let table = schema.query_table(level)?;
        let parent = match level.parent() {
            Some(parent) => Some(schema.query_table(parent)?),
            None => None,
        };

        let ddl = table_ddl(table, parent)?;
        conn.execute_batch(&ddl).map_err(|e| {
            migration_error(format!("Failed to create {} table: {}", table.name, e))
        })?;
    }
    Ok(())
}

/// Returns the `CREATE TABLE` and `CREATE INDEX` statements for `table`.
pub fn table_ddl(
    table: &TableDescriptor,
    parent: Option<&TableDescriptor>,
) -> StorageResult<String> {
    let uid = uid_column(table)?;

    let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", table.key_column)];
    if let Some(parent) = parent {
        columns.push(format!(
            "{} INTEGER NOT NULL REFERENCES {}({}) ON DELETE CASCADE",
            parent_key_column(table)?,
            parent.name,
            parent.key_column
        ));
    }
    for column in &table.columns {
        if column.name == uid.name {
            columns.push(format!("{} TEXT NOT NULL UNIQUE", column.name));
        } else {
            columns.push(format!("{} TEXT", column.name));
        }
    }
    if table.level == QueryLevel::Instance {
        columns.push(format!("{} TEXT", METADATA_COLUMN));
        columns.push(format!("{} TEXT", METADATA_UPDATED_COLUMN));
    }
    columns.push(format!("{} TEXT NOT NULL", STORED_AT_COLUMN));

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);\n",
        table.name,
        columns.join(",\n    ")
    );
    if parent.is_some() {
        let fk = parent_key_column(table)?;
        ddl.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{fk} ON {table}({fk});\n",
            table = table.name,
        ));
    }
    Ok(ddl)
}
