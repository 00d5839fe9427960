//! Table descriptors and the schema provider.
//!
//! The schema maps each [`QueryLevel`] to the table that holds its entities and
//! each queryable attribute to a column. Command construction and response
//! shaping both resolve through it, so a backend with a different physical
//! layout only needs a different provider.

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, StorageResult};
use crate::types::{QueryLevel, Tag, Vr, tag};

/// One attribute column of a level table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// The attribute stored in this column.
    pub tag: Tag,
    /// Value representation of the attribute.
    pub vr: Vr,
}

impl ColumnDescriptor {
    /// Creates a column using the dictionary VR of `tag` (LO if unknown).
    pub fn new(name: impl Into<String>, tag: Tag) -> Self {
        Self {
            name: name.into(),
            tag,
            vr: tag.vr().unwrap_or(Vr::LO),
        }
    }
}

/// The table holding the entities of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Level of the entities in this table.
    pub level: QueryLevel,
    /// Surrogate key column.
    pub key_column: String,
    /// Column referencing the parent table's key, if the level has a parent.
    pub parent_key_column: Option<String>,
    /// Attribute columns. The first column holds the level's unique key.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Returns the column storing `tag`, if any.
    pub fn column_for(&self, tag: Tag) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.tag == tag)
    }

    /// Returns the column holding the level's unique identifier.
    pub fn uid_column(&self) -> Option<&ColumnDescriptor> {
        self.column_for(self.level.key_tag())
    }
}

/// Maps query levels to tables and attributes to columns.
pub trait SchemaProvider: Send + Sync + std::fmt::Debug {
    /// Returns the table for `level`.
    fn query_table(&self, level: QueryLevel) -> StorageResult<&TableDescriptor>;

    /// Returns the level and column storing `tag`, searching every table.
    fn locate(&self, tag: Tag) -> Option<(QueryLevel, &ColumnDescriptor)> {
        QueryLevel::ALL.iter().find_map(|level| {
            self.query_table(*level)
                .ok()
                .and_then(|table| table.column_for(tag))
                .map(|column| (*level, column))
        })
    }
}

/// The default three-table layout.
#[derive(Debug, Clone)]
pub struct StandardSchema {
    tables: Vec<TableDescriptor>,
}

impl StandardSchema {
    /// Creates the standard schema.
    pub fn new() -> Self {
        let study = TableDescriptor {
            name: "study".to_string(),
            level: QueryLevel::Study,
            key_column: "study_key".to_string(),
            parent_key_column: None,
            columns: vec![
                ColumnDescriptor::new("study_instance_uid", tag::STUDY_INSTANCE_UID),
                ColumnDescriptor::new("patient_id", tag::PATIENT_ID),
                ColumnDescriptor::new("patient_name", tag::PATIENT_NAME),
                ColumnDescriptor::new("patient_birth_date", tag::PATIENT_BIRTH_DATE),
                ColumnDescriptor::new("patient_sex", tag::PATIENT_SEX),
                ColumnDescriptor::new("study_id", tag::STUDY_ID),
                ColumnDescriptor::new("study_date", tag::STUDY_DATE),
                ColumnDescriptor::new("study_time", tag::STUDY_TIME),
                ColumnDescriptor::new("accession_number", tag::ACCESSION_NUMBER),
                ColumnDescriptor::new("referring_physician_name", tag::REFERRING_PHYSICIAN_NAME),
                ColumnDescriptor::new("study_description", tag::STUDY_DESCRIPTION),
            ],
        };
        let series = TableDescriptor {
            name: "series".to_string(),
            level: QueryLevel::Series,
            key_column: "series_key".to_string(),
            parent_key_column: Some("study_key".to_string()),
            columns: vec![
                ColumnDescriptor::new("series_instance_uid", tag::SERIES_INSTANCE_UID),
                ColumnDescriptor::new("modality", tag::MODALITY),
                ColumnDescriptor::new("series_number", tag::SERIES_NUMBER),
                ColumnDescriptor::new("series_date", tag::SERIES_DATE),
                ColumnDescriptor::new("series_description", tag::SERIES_DESCRIPTION),
                ColumnDescriptor::new("body_part_examined", tag::BODY_PART_EXAMINED),
            ],
        };
        let instance = TableDescriptor {
            name: "instance".to_string(),
            level: QueryLevel::Instance,
            key_column: "instance_key".to_string(),
            parent_key_column: Some("series_key".to_string()),
            columns: vec![
                ColumnDescriptor::new("sop_instance_uid", tag::SOP_INSTANCE_UID),
                ColumnDescriptor::new("sop_class_uid", tag::SOP_CLASS_UID),
                ColumnDescriptor::new("instance_number", tag::INSTANCE_NUMBER),
                ColumnDescriptor::new("transfer_syntax_uid", tag::TRANSFER_SYNTAX_UID),
            ],
        };

        Self {
            tables: vec![study, series, instance],
        }
    }

    /// Creates a schema from custom table descriptors.
    pub fn from_tables(tables: Vec<TableDescriptor>) -> Self {
        Self { tables }
    }

    /// Returns every table, parents first.
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }
}

impl Default for StandardSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaProvider for StandardSchema {
    fn query_table(&self, level: QueryLevel) -> StorageResult<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.level == level)
            .ok_or_else(|| SearchError::UnmappedLevel { level }.into())
    }
}
