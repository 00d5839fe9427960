//! SQL generation for archive commands.
//!
//! All statements are derived from the [`TableDescriptor`]s of the schema
//! provider. A level's rows are always selected together with their ancestors,
//! joined through the parent key columns:
//!
//! ```sql
//! study JOIN series ON series.study_key = study.study_key
//!       JOIN instance ON instance.series_key = series.series_key
//! ```
//!
//! Conditions on attributes of a deeper level than the one searched become
//! `EXISTS` subqueries, so each matched entity still yields exactly one row.

use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

use crate::core::{ColumnDescriptor, SchemaProvider, TableDescriptor};
use crate::error::{BackendError, StorageError, StorageResult};
use crate::types::{Matching, MatchingCondition, QueryLevel, QueryOptions};

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, Default)]
pub struct SqlFragment {
    /// The SQL clause, with `?` placeholders.
    pub sql: String,
    /// Bound parameter values, in placeholder order.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::String(s) => s.to_sql(),
            SqlParam::Integer(i) => i.to_sql(),
        }
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Combines with another fragment using AND.
    pub fn and(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) AND ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

fn schema_error(message: String) -> StorageError {
    StorageError::Backend(BackendError::QueryError { message })
}

/// The tables from the study level down to one level, parents first.
#[derive(Debug)]
pub struct Hierarchy<'a> {
    tables: Vec<&'a TableDescriptor>,
}

impl<'a> Hierarchy<'a> {
    /// Resolves the tables from the study level down to `level`.
    pub fn down_to(schema: &'a dyn SchemaProvider, level: QueryLevel) -> StorageResult<Self> {
        Self::between(schema, QueryLevel::Study, level)
    }

    /// Resolves the tables from `top` down to `bottom`, both included.
    pub fn between(
        schema: &'a dyn SchemaProvider,
        top: QueryLevel,
        bottom: QueryLevel,
    ) -> StorageResult<Self> {
        let tables = QueryLevel::ALL
            .iter()
            .filter(|l| l.depth() >= top.depth() && l.depth() <= bottom.depth())
            .map(|l| schema.query_table(*l))
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Self { tables })
    }

    /// The deepest table.
    pub fn target(&self) -> StorageResult<&'a TableDescriptor> {
        self.tables
            .last()
            .copied()
            .ok_or_else(|| schema_error("empty table hierarchy".to_string()))
    }

    /// The tables, parents first.
    pub fn tables(&self) -> &[&'a TableDescriptor] {
        &self.tables
    }

    /// `FROM`-clause body joining every table of the hierarchy.
    pub fn from_clause(&self) -> StorageResult<String> {
        let mut sql = String::new();
        for (i, table) in self.tables.iter().enumerate() {
            if i == 0 {
                sql.push_str(&table.name);
            } else {
                sql.push(' ');
                sql.push_str(&join_clause(self.tables[i - 1], table)?);
            }
        }
        Ok(sql)
    }

    /// Matches each level's unique identifier against `uids`, parents first.
    pub fn identifier_filter(&self, uids: &[&str]) -> StorageResult<SqlFragment> {
        if uids.len() != self.tables.len() {
            return Err(schema_error(format!(
                "expected {} identifiers, got {}",
                self.tables.len(),
                uids.len()
            )));
        }
        let mut filter = SqlFragment::default();
        for (table, uid) in self.tables.iter().zip(uids) {
            let column = uid_column(table)?;
            filter = filter.and(SqlFragment::with_params(
                format!("{}.{} = ?", table.name, column.name),
                vec![SqlParam::string(*uid)],
            ));
        }
        Ok(filter)
    }
}

/// Returns the column holding `table`'s unique identifier.
pub fn uid_column(table: &TableDescriptor) -> StorageResult<&ColumnDescriptor> {
    table.uid_column().ok_or_else(|| {
        schema_error(format!("table {} has no column for {}", table.name, table.level.key_tag()))
    })
}

/// Returns the column referencing `table`'s parent.
pub fn parent_key_column(table: &TableDescriptor) -> StorageResult<&str> {
    table
        .parent_key_column
        .as_deref()
        .ok_or_else(|| schema_error(format!("table {} has no parent key column", table.name)))
}

fn join_clause(parent: &TableDescriptor, child: &TableDescriptor) -> StorageResult<String> {
    Ok(format!(
        "JOIN {child} ON {child}.{fk} = {parent}.{pk}",
        child = child.name,
        fk = parent_key_column(child)?,
        parent = parent.name,
        pk = parent.key_column,
    ))
}

/// Translates one matching condition on `column` into a predicate.
///
/// Returns `None` for conditions that constrain nothing.
pub fn matching_predicate(column: &str, matching: &Matching) -> Option<SqlFragment> {
    match matching {
        Matching::Universal => None,
        Matching::Single { value } => Some(SqlFragment::with_params(
            format!("{column} = ?"),
            vec![SqlParam::string(value)],
        )),
        Matching::Wildcard { pattern } => Some(SqlFragment::with_params(
            format!("{column} LIKE ? ESCAPE '\\'"),
            vec![SqlParam::string(like_pattern(pattern))],
        )),
        Matching::UidList { uids } if uids.is_empty() => Some(SqlFragment::new("0")),
        Matching::UidList { uids } => {
            let placeholders = vec!["?"; uids.len()].join(", ");
            Some(SqlFragment::with_params(
                format!("{column} IN ({placeholders})"),
                uids.iter().map(SqlParam::string).collect(),
            ))
        }
        Matching::Range { from, to } => {
            let mut fragment = SqlFragment::default();
            if let Some(from) = from {
                fragment = fragment.and(SqlFragment::with_params(
                    format!("{column} >= ?"),
                    vec![SqlParam::string(from)],
                ));
            }
            if let Some(to) = to {
                fragment = fragment.and(SqlFragment::with_params(
                    format!("{column} <= ?"),
                    vec![SqlParam::string(to)],
                ));
            }
            (!fragment.is_empty()).then_some(fragment)
        }
    }
}

/// Converts a DICOM wildcard pattern to a `LIKE` pattern escaped with `\`.
pub fn like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('%'),
            '?' => out.push('_'),
            _ => out.push(c),
        }
    }
    out
}

/// A compiled search.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    /// The row query, without paging.
    pub sql: String,
    /// The count query over the same filter.
    pub count_sql: String,
    /// Filter parameters, shared by both queries.
    pub params: Vec<SqlParam>,
    /// `LIMIT`/`OFFSET` parameters appended to the row query.
    pub paging: Vec<SqlParam>,
    /// The selected columns, in select-list order.
    pub columns: Vec<(QueryLevel, ColumnDescriptor)>,
}

impl SelectQuery {
    /// Returns true if the row query is paged.
    pub fn is_paged(&self) -> bool {
        !self.paging.is_empty()
    }

    /// The row query including paging.
    pub fn paged_sql(&self) -> String {
        if self.is_paged() {
            format!("{} LIMIT ? OFFSET ?", self.sql)
        } else {
            self.sql.clone()
        }
    }

    /// Parameters of the paged row query.
    pub fn paged_params(&self) -> impl Iterator<Item = &SqlParam> {
        self.params.iter().chain(self.paging.iter())
    }
}

/// Builds the select for `table`'s level.
pub fn build_select(
    schema: &dyn SchemaProvider,
    table: &TableDescriptor,
    conditions: &[MatchingCondition],
    options: Option<&QueryOptions>,
) -> StorageResult<SelectQuery> {
    let level = table.level;
    let hierarchy = Hierarchy::down_to(schema, level)?;
    let from = hierarchy.from_clause()?;

    let mut columns = Vec::new();
    let mut select_list = Vec::new();
    for t in hierarchy.tables() {
        for column in &t.columns {
            select_list.push(format!("{}.{}", t.name, column.name));
            columns.push((t.level, column.clone()));
        }
    }

    let mut filter = SqlFragment::default();
    for condition in conditions {
        if let Some(predicate) = condition_predicate(schema, level, condition)? {
            filter = filter.and(predicate);
        }
    }
    let where_clause = if filter.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filter.sql)
    };

    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}.{}",
        select_list.join(", "),
        from,
        where_clause,
        table.name,
        table.key_column,
    );
    let count_sql = format!("SELECT COUNT(*) FROM {}{}", from, where_clause);

    let paging = match options {
        Some(QueryOptions {
            limit: Some(limit),
            offset,
        }) => vec![
            SqlParam::integer(i64::from(*limit)),
            SqlParam::integer(i64::from(offset.unwrap_or(0))),
        ],
        Some(QueryOptions {
            limit: None,
            offset: Some(offset),
        }) if *offset > 0 => vec![SqlParam::integer(-1), SqlParam::integer(i64::from(*offset))],
        _ => Vec::new(),
    };

    Ok(SelectQuery {
        sql,
        count_sql,
        params: filter.params,
        paging,
        columns,
    })
}

fn condition_predicate(
    schema: &dyn SchemaProvider,
    level: QueryLevel,
    condition: &MatchingCondition,
) -> StorageResult<Option<SqlFragment>> {
    if condition.is_universal() {
        return Ok(None);
    }
    let Some((column_level, column)) = schema.locate(condition.tag()) else {
        tracing::debug!(tag = %condition.tag(), "no column for matching attribute, ignored");
        return Ok(None);
    };
    let table = schema.query_table(column_level)?;
    let qualified = format!("{}.{}", table.name, column.name);
    let Some(predicate) = matching_predicate(&qualified, condition.matching()) else {
        return Ok(None);
    };

    if column_level.depth() <= level.depth() {
        return Ok(Some(predicate));
    }

    // Attribute of a descendant level: match if any descendant matches.
    let outer = schema.query_table(level)?;
    let Some(first_child) = level.child() else {
        return Ok(None);
    };
    let inner = Hierarchy::between(schema, first_child, column_level)?;
    let top = inner.tables()[0];
    let correlation = format!(
        "{}.{} = {}.{}",
        top.name,
        parent_key_column(top)?,
        outer.name,
        outer.key_column
    );
    Ok(Some(SqlFragment::with_params(
        format!(
            "EXISTS (SELECT 1 FROM {} WHERE {} AND ({}))",
            inner.from_clause()?,
            correlation,
            predicate.sql
        ),
        predicate.params,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StandardSchema;
    use crate::types::tag;

    fn select(level: QueryLevel, conditions: &[MatchingCondition], options: Option<&QueryOptions>) -> SelectQuery {
        let schema = StandardSchema::new();
        let table = schema.query_table(level).unwrap();
        build_select(&schema, table, conditions, options).unwrap()
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("DOE^J*"), "DOE^J%");
        assert_eq!(like_pattern("A?C"), "A_C");
        assert_eq!(like_pattern("100%_x"), "100\\%\\_x");
    }

    #[test]
    fn test_from_clause_joins_parents() {
        let schema = StandardSchema::new();
        let from = Hierarchy::down_to(&schema, QueryLevel::Instance)
            .unwrap()
            .from_clause()
            .unwrap();
        assert_eq!(
            from,
            "study JOIN series ON series.study_key = study.study_key \
             JOIN instance ON instance.series_key = series.series_key"
        );
    }

    #[test]
    fn test_study_select_without_conditions() {
        let query = select(QueryLevel::Study, &[], None);
        assert!(query.sql.starts_with("SELECT study.study_instance_uid"));
        assert!(query.sql.ends_with("FROM study ORDER BY study.study_key"));
        assert!(query.params.is_empty());
        assert!(!query.is_paged());
        assert!(query.columns.iter().all(|(l, _)| *l == QueryLevel::Study));
    }

    #[test]
    fn test_series_select_includes_study_columns() {
        let query = select(QueryLevel::Series, &[], None);
        assert!(query.columns.iter().any(|(_, c)| c.tag == tag::STUDY_INSTANCE_UID));
        assert!(query.columns.iter().any(|(_, c)| c.tag == tag::MODALITY));
        assert!(!query.columns.iter().any(|(_, c)| c.tag == tag::SOP_INSTANCE_UID));
    }

    #[test]
    fn test_conditions_become_predicates() {
        let conditions = vec![
            MatchingCondition::single(tag::PATIENT_ID, "PAT-1"),
            MatchingCondition::wildcard(tag::PATIENT_NAME, "DOE*"),
            MatchingCondition::range(tag::STUDY_DATE, Some("20240101".into()), None),
            MatchingCondition::universal(tag::STUDY_DESCRIPTION),
        ];
        let query = select(QueryLevel::Study, &conditions, None);
        assert!(query.sql.contains("study.patient_id = ?"));
        assert!(query.sql.contains("study.patient_name LIKE ? ESCAPE '\\'"));
        assert!(query.sql.contains("study.study_date >= ?"));
        assert_eq!(
            query.params,
            vec![
                SqlParam::string("PAT-1"),
                SqlParam::string("DOE%"),
                SqlParam::string("20240101"),
            ]
        );
        assert!(query.count_sql.contains("WHERE"));
    }

    #[test]
    fn test_child_attribute_becomes_exists() {
        let conditions = vec![MatchingCondition::single(tag::MODALITY, "MR")];
        let query = select(QueryLevel::Study, &conditions, None);
        assert!(query.sql.contains(
            "EXISTS (SELECT 1 FROM series WHERE series.study_key = study.study_key AND (series.modality = ?))"
        ));
        assert_eq!(query.params, vec![SqlParam::string("MR")]);
    }

    #[test]
    fn test_grandchild_attribute_becomes_exists() {
        let conditions = vec![MatchingCondition::single(tag::SOP_CLASS_UID, "1.2.840.10008.5.1.4.1.1.2")];
        let query = select(QueryLevel::Study, &conditions, None);
        assert!(query.sql.contains(
            "EXISTS (SELECT 1 FROM series JOIN instance ON instance.series_key = series.series_key \
             WHERE series.study_key = study.study_key AND (instance.sop_class_uid = ?))"
        ));
    }

    #[test]
    fn test_unmapped_attribute_is_ignored() {
        let conditions = vec![MatchingCondition::single(tag::MODALITIES_IN_STUDY, "CT")];
        let query = select(QueryLevel::Study, &conditions, None);
        assert!(!query.sql.contains("WHERE"));
    }

    #[test]
    fn test_uid_list() {
        let conditions = vec![MatchingCondition::uid_list(tag::STUDY_INSTANCE_UID, ["1.1", "1.2"])];
        let query = select(QueryLevel::Series, &conditions, None);
        assert!(query.sql.contains("study.study_instance_uid IN (?, ?)"));

        let empty = vec![MatchingCondition::uid_list(tag::STUDY_INSTANCE_UID, Vec::<String>::new())];
        let query = select(QueryLevel::Study, &empty, None);
        assert!(query.sql.contains("WHERE 0"));
    }

    #[test]
    fn test_paging() {
        let query = select(QueryLevel::Study, &[], Some(&QueryOptions::paged(10, 20)));
        assert!(query.is_paged());
        assert!(query.paged_sql().ends_with("LIMIT ? OFFSET ?"));
        assert_eq!(query.paging, vec![SqlParam::integer(10), SqlParam::integer(20)]);

        let query = select(QueryLevel::Study, &[], Some(&QueryOptions::new().with_offset(5)));
        assert_eq!(query.paging, vec![SqlParam::integer(-1), SqlParam::integer(5)]);
    }

    #[test]
    fn test_identifier_filter() {
        let schema = StandardSchema::new();
        let hierarchy = Hierarchy::down_to(&schema, QueryLevel::Series).unwrap();
        let filter = hierarchy.identifier_filter(&["1.2", "1.2.3"]).unwrap();
        assert_eq!(
            filter.sql,
            "(study.study_instance_uid = ?) AND (series.series_instance_uid = ?)"
        );
        assert!(hierarchy.identifier_filter(&["1.2"]).is_err());
    }
}
