//! SQLite backend implementation.
//!
//! This module provides a complete SQLite implementation of the archive's
//! collaborator traits. It supports both in-memory databases (great for
//! testing) and file-based databases (for development and small deployments).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pacs_persistence::archive::ObjectArchiveAccess;
//! use pacs_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory database
//! let backend = Arc::new(SqliteBackend::in_memory()?);
//!
//! // Initialize the schema
//! backend.init_schema()?;
//!
//! // The archive shares the backend's schema
//! let archive = ObjectArchiveAccess::new(backend.clone(), backend.schema());
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE study (
//!     study_key INTEGER PRIMARY KEY AUTOINCREMENT,
//!     study_instance_uid TEXT NOT NULL UNIQUE,
//!     patient_id TEXT,
//!     -- one TEXT column per study attribute
//!     stored_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE series (
//!     series_key INTEGER PRIMARY KEY AUTOINCREMENT,
//!     study_key INTEGER NOT NULL REFERENCES study(study_key) ON DELETE CASCADE,
//!     series_instance_uid TEXT NOT NULL UNIQUE,
//!     -- one TEXT column per series attribute
//!     stored_at TEXT NOT NULL
//! );
//!
//! CREATE TABLE instance (
//!     instance_key INTEGER PRIMARY KEY AUTOINCREMENT,
//!     series_key INTEGER NOT NULL REFERENCES series(series_key) ON DELETE CASCADE,
//!     sop_instance_uid TEXT NOT NULL UNIQUE,
//!     -- one TEXT column per instance attribute
//!     metadata TEXT,             -- InstanceMetadata JSON
//!     metadata_updated_at TEXT,
//!     stored_at TEXT NOT NULL
//! );
//! ```
//!
//! Multi-valued attributes are stored backslash-separated in one column.

mod adapter;
mod backend;
mod commands;
mod query_builder;
mod schema;

pub use backend::{SqliteBackend, SqliteBackendConfig, SqliteConnection};
pub use commands::{
    DeleteCommand, InsertCommand, InstanceMetadataCommand, KeyQueryCommand,
    MetadataQueryCommand, SelectCommand, UpdateMetadataCommand,
};
pub use query_builder::{SelectQuery, SqlFragment, SqlParam};
pub use schema::SCHEMA_VERSION;
