//! Query levels of the study / series / instance hierarchy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::tag::{self, Tag};

/// Which tier of the hierarchy a search or metadata operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLevel {
    /// Study level.
    Study,
    /// Series level.
    Series,
    /// Instance (composite object) level.
    Instance,
}

impl QueryLevel {
    /// All levels, parents first.
    pub const ALL: [QueryLevel; 3] = [QueryLevel::Study, QueryLevel::Series, QueryLevel::Instance];

    /// Returns the unique key attribute of this level.
    pub fn key_tag(&self) -> Tag {
        match self {
            QueryLevel::Study => tag::STUDY_INSTANCE_UID,
            QueryLevel::Series => tag::SERIES_INSTANCE_UID,
            QueryLevel::Instance => tag::SOP_INSTANCE_UID,
        }
    }

    /// Returns the parent level, if any.
    pub fn parent(&self) -> Option<QueryLevel> {
        match self {
            QueryLevel::Study => None,
            QueryLevel::Series => Some(QueryLevel::Study),
            QueryLevel::Instance => Some(QueryLevel::Series),
        }
    }

    /// Returns the child level, if any.
    pub fn child(&self) -> Option<QueryLevel> {
        match self {
            QueryLevel::Study => Some(QueryLevel::Series),
            QueryLevel::Series => Some(QueryLevel::Instance),
            QueryLevel::Instance => None,
        }
    }

    /// Depth in the hierarchy, study = 0.
    pub fn depth(&self) -> usize {
        match self {
            QueryLevel::Study => 0,
            QueryLevel::Series => 1,
            QueryLevel::Instance => 2,
        }
    }

    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryLevel::Study => "study",
            QueryLevel::Series => "series",
            QueryLevel::Instance => "instance",
        }
    }
}

impl fmt::Display for QueryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "study" | "studies" => Ok(QueryLevel::Study),
            "series" => Ok(QueryLevel::Series),
            "instance" | "instances" | "image" | "object" => Ok(QueryLevel::Instance),
            other => Err(format!("unknown query level: {}", other)),
        }
    }
}
