//! Hierarchical object identifiers and internal surrogate keys.
//!
//! A [`SeriesId`] always carries the study it belongs to, and an [`ObjectId`]
//! carries both its study and series. These are plain values; the archive never
//! mutates them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a study by its Study Instance UID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudyId {
    study_instance_uid: String,
}

impl StudyId {
    /// Creates a study identifier.
    pub fn new(study_instance_uid: impl Into<String>) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
        }
    }

    /// Returns the Study Instance UID.
    pub fn study_instance_uid(&self) -> &str {
        &self.study_instance_uid
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.study_instance_uid)
    }
}

/// Identifies a series within its study.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesId {
    study_instance_uid: String,
    series_instance_uid: String,
}

impl SeriesId {
    /// Creates a series identifier.
    pub fn new(
        study_instance_uid: impl Into<String>,
        series_instance_uid: impl Into<String>,
    ) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            series_instance_uid: series_instance_uid.into(),
        }
    }

    /// Returns the Study Instance UID.
    pub fn study_instance_uid(&self) -> &str {
        &self.study_instance_uid
    }

    /// Returns the Series Instance UID.
    pub fn series_instance_uid(&self) -> &str {
        &self.series_instance_uid
    }

    /// Returns the owning study.
    pub fn study(&self) -> StudyId {
        StudyId::new(self.study_instance_uid.clone())
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.study_instance_uid, self.series_instance_uid)
    }
}

/// Identifies a composite object (instance) within its series and study.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    study_instance_uid: String,
    series_instance_uid: String,
    sop_instance_uid: String,
}

impl ObjectId {
    /// Creates an instance identifier.
    pub fn new(
        study_instance_uid: impl Into<String>,
        series_instance_uid: impl Into<String>,
        sop_instance_uid: impl Into<String>,
    ) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            series_instance_uid: series_instance_uid.into(),
            sop_instance_uid: sop_instance_uid.into(),
        }
    }

    /// Returns the Study Instance UID.
    pub fn study_instance_uid(&self) -> &str {
        &self.study_instance_uid
    }

    /// Returns the Series Instance UID.
    pub fn series_instance_uid(&self) -> &str {
        &self.series_instance_uid
    }

    /// Returns the SOP Instance UID.
    pub fn sop_instance_uid(&self) -> &str {
        &self.sop_instance_uid
    }

    /// Returns the owning series.
    pub fn series(&self) -> SeriesId {
        SeriesId::new(
            self.study_instance_uid.clone(),
            self.series_instance_uid.clone(),
        )
    }

    /// Returns the owning study.
    pub fn study(&self) -> StudyId {
        StudyId::new(self.study_instance_uid.clone())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.study_instance_uid, self.series_instance_uid, self.sop_instance_uid
        )
    }
}

/// A database-assigned surrogate key.
///
/// Only valid for the lifetime of the row it names; obtained by a key-resolution
/// command and consumed by the next command of the same operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternalKey(i64);

impl InternalKey {
    /// Wraps a raw key value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw key value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
