//! Turning raw result rows into response datasets.
//!
//! A select command drives a [`ResponseBuilder`] row by row: `begin_row`, one
//! `read_column` per selected column, then `end_row`. Which builder is used is
//! decided by the [`ResponseBuilderFactory`] the archive was constructed with.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::StorageResult;
use crate::types::{Dataset, QueryLevel, Tag};

use super::schema::{ColumnDescriptor, SchemaProvider};

/// Separator used for multi-valued attributes stored in one column.
pub const VALUE_SEPARATOR: char = '\\';

/// Accumulates one search's rows into datasets.
pub trait ResponseBuilder: Send {
    /// The level this builder shapes responses for.
    fn level(&self) -> QueryLevel;

    /// Starts a new row.
    fn begin_row(&mut self);

    /// Reads one column of the current row. `level` is the level of the table
    /// the column belongs to; `None` is a SQL NULL.
    fn read_column(&mut self, level: QueryLevel, column: &ColumnDescriptor, value: Option<&str>);

    /// Finishes the current row.
    fn end_row(&mut self);

    /// Returns the datasets built so far, in row order.
    fn into_response(self: Box<Self>) -> Vec<Dataset>;
}

/// Creates response builders for a level.
pub trait ResponseBuilderFactory: Send + Sync + std::fmt::Debug {
    /// Creates a builder for `level`.
    fn create(&self, level: QueryLevel) -> StorageResult<Box<dyn ResponseBuilder>>;
}

/// The default builder.
///
/// Only columns at or above the response level are kept, so a series response
/// carries study attributes but never instance attributes. Rows repeating a
/// unique key already seen are dropped.
#[derive(Debug)]
pub struct QueryResponseBuilder {
    level: QueryLevel,
    key_tag: Tag,
    current: Option<Dataset>,
    rows: Vec<Dataset>,
    seen: HashSet<String>,
}

impl QueryResponseBuilder {
    /// Creates a builder for `level`, checking the level is mapped by `schema`.
    pub fn new(schema: &dyn SchemaProvider, level: QueryLevel) -> StorageResult<Self> {
        let table = schema.query_table(level)?;
        Ok(Self {
            level,
            key_tag: table.level.key_tag(),
            current: None,
            rows: Vec::new(),
            seen: HashSet::new(),
        })
    }
}

impl ResponseBuilder for QueryResponseBuilder {
    fn level(&self) -> QueryLevel {
        self.level
    }

    fn begin_row(&mut self) {
        self.current = Some(Dataset::new());
    }

    fn read_column(&mut self, level: QueryLevel, column: &ColumnDescriptor, value: Option<&str>) {
        if level.depth() > self.level.depth() {
            return;
        }
        let (Some(row), Some(value)) = (self.current.as_mut(), value) else {
            return;
        };

        let values = if value.is_empty() {
            Vec::new()
        } else {
            value.split(VALUE_SEPARATOR).map(str::to_string).collect()
        };
        row.insert(column.tag, column.vr, values);
    }

    fn end_row(&mut self) {
        let Some(row) = self.current.take() else {
            return;
        };
        if let Some(key) = row.string(self.key_tag) {
            if !self.seen.insert(key.to_string()) {
                return;
            }
        }
        self.rows.push(row);
    }

    fn into_response(self: Box<Self>) -> Vec<Dataset> {
        self.rows
    }
}

/// Factory for [`QueryResponseBuilder`].
#[derive(Debug, Clone)]
pub struct QueryResponseBuilderFactory {
    schema: Arc<dyn SchemaProvider>,
}

impl QueryResponseBuilderFactory {
    /// Creates a factory resolving levels through `schema`.
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self { schema }
    }
}

impl ResponseBuilderFactory for QueryResponseBuilderFactory {
    fn create(&self, level: QueryLevel) -> StorageResult<Box<dyn ResponseBuilder>> {
        Ok(Box::new(QueryResponseBuilder::new(self.schema.as_ref(), level)?))
    }
}
