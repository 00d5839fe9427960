//! Matching conditions supplied by the query-translation layer.
//!
//! A condition names one attribute and how its value should be matched. The archive
//! orchestrator passes conditions through untouched; the command adapter decides how
//! each kind of matching maps onto its store.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

use super::tag::{Tag, Vr};

/// The kind of matching requested for an attribute (DICOM PS3.4 C.2.2.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Matching {
    /// Matches every entity; the attribute is only requested as a return key.
    Universal,
    /// Exact value match.
    Single {
        /// The value to match.
        value: String,
    },
    /// Pattern with `*` (any sequence) and `?` (any single character).
    Wildcard {
        /// The pattern as sent by the client.
        pattern: String,
    },
    /// Any of the listed UIDs.
    UidList {
        /// Accepted UIDs; an empty list matches nothing.
        uids: Vec<String>,
    },
    /// Inclusive range; an absent bound is open.
    Range {
        /// Lower bound.
        from: Option<String>,
        /// Upper bound.
        to: Option<String>,
    },
}

/// A predicate over a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingCondition {
    tag: Tag,
    matching: Matching,
}

impl MatchingCondition {
    /// Creates a condition.
    pub fn new(tag: Tag, matching: Matching) -> Self {
        Self { tag, matching }
    }

    /// Requests an attribute without filtering on it.
    pub fn universal(tag: Tag) -> Self {
        Self::new(tag, Matching::Universal)
    }

    /// Exact match on a single value.
    pub fn single(tag: Tag, value: impl Into<String>) -> Self {
        Self::new(
            tag,
            Matching::Single {
                value: value.into(),
            },
        )
    }

    /// Wildcard match.
    pub fn wildcard(tag: Tag, pattern: impl Into<String>) -> Self {
        Self::new(
            tag,
            Matching::Wildcard {
                pattern: pattern.into(),
            },
        )
    }

    /// Match against a list of UIDs.
    pub fn uid_list<I, S>(tag: Tag, uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            tag,
            Matching::UidList {
                uids: uids.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Inclusive range match.
    pub fn range(tag: Tag, from: Option<String>, to: Option<String>) -> Self {
        Self::new(tag, Matching::Range { from, to })
    }

    /// Interprets a raw query value the way a C-FIND identifier would.
    ///
    /// Empty values and a lone `*` are universal; backslash-separated values on UI
    /// attributes are UID lists; `from-to` on date/time attributes is a range;
    /// values containing `*` or `?` are wildcards; anything else is a single value.
    pub fn parse(tag: Tag, raw: &str) -> Result<Self, SearchError> {
        let value = raw.trim();
        let vr = tag.vr();

        if value.is_empty() || value == "*" {
            return Ok(Self::universal(tag));
        }

        if vr == Some(Vr::UI) && value.contains('\\') {
            return Ok(Self::uid_list(
                tag,
                value.split('\\').map(str::trim).filter(|s| !s.is_empty()),
            ));
        }

        if vr.is_some_and(|vr| vr.supports_range()) && value.contains('-') {
            let invalid = || SearchError::InvalidRange {
                tag,
                value: value.to_string(),
            };
            let (from, to) = value.split_once('-').ok_or_else(invalid)?;
            if to.contains('-') || (from.is_empty() && to.is_empty()) {
                return Err(invalid());
            }
            let bound = |s: &str| (!s.is_empty()).then(|| s.to_string());
            return Ok(Self::range(tag, bound(from), bound(to)));
        }

        if value.contains('*') || value.contains('?') {
            return Ok(Self::wildcard(tag, value));
        }

        Ok(Self::single(tag, value))
    }

    /// Returns the attribute this condition applies to.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the requested matching.
    pub fn matching(&self) -> &Matching {
        &self.matching
    }

    /// Returns true if this condition does not filter.
    pub fn is_universal(&self) -> bool {
        matches!(self.matching, Matching::Universal)
    }
}
