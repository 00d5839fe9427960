//! Collaborator traits the archive is built from.
//!
//! - [`ArchiveBackend`] - Connection pool and transaction primitives
//! - [`CommandAdapter`] - Builds the [`Command`]s for every archive operation
//! - [`SchemaProvider`] - Maps levels to tables and attributes to columns
//! - [`ResponseBuilderFactory`] - Creates the [`ResponseBuilder`] that shapes
//!   search rows into datasets
//! - [`TransactionScope`] - Commit-or-rollback guard for multi-command work
//!
//! # Trait Hierarchy
//!
//! ```text
//! ArchiveBackend
//!     └── CommandAdapter ──creates──> Command<Connection>
//!                                          │
//! SchemaProvider ──> TableDescriptor ──────┤
//!                                          │
//! ResponseBuilderFactory ──> ResponseBuilder
//! ```

mod backend;
mod command;
mod response;
mod schema;
mod transaction;

pub use backend::ArchiveBackend;
pub use command::{BoxedCommand, Command, CommandAdapter};
pub use response::{
    QueryResponseBuilder, QueryResponseBuilderFactory, ResponseBuilder, ResponseBuilderFactory,
    VALUE_SEPARATOR,
};
pub use schema::{ColumnDescriptor, SchemaProvider, StandardSchema, TableDescriptor};
pub use transaction::TransactionScope;
