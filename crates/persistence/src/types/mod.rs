//! Core types for the archive data-access layer.
//!
//! - [`StudyId`], [`SeriesId`], [`ObjectId`] - Hierarchical identifiers
//! - [`InternalKey`] - Store surrogate keys used by key resolution
//! - [`QueryLevel`] - Study / series / instance tiers
//! - [`MatchingCondition`] - Search predicates
//! - [`QueryOptions`], [`PagedResult`] - Paging
//! - [`Dataset`] - Search results in the DICOM JSON model
//! - [`InstanceMetadata`] - Auxiliary per-instance data
//! - [`DataParameter`] - Attribute values for storing an instance
//!
//! # Examples
//!
//! ## Building conditions
//!
//! ```
//! use pacs_persistence::types::{tag, MatchingCondition, QueryOptions};
//!
//! let conditions = vec![
//!     MatchingCondition::parse(tag::PATIENT_ID, "PAT-001").unwrap(),
//!     MatchingCondition::parse(tag::STUDY_DATE, "20240101-").unwrap(),
//!     MatchingCondition::universal(tag::STUDY_DESCRIPTION),
//! ];
//! let options = QueryOptions::paged(20, 0);
//! assert_eq!(conditions.len(), 3);
//! assert_eq!(options.limit, Some(20));
//! ```
//!
//! ## Identifiers
//!
//! ```
//! use pacs_persistence::types::ObjectId;
//!
//! let id = ObjectId::new("1.2.840.1", "1.2.840.1.1", "1.2.840.1.1.1");
//! assert_eq!(id.series().series_instance_uid(), "1.2.840.1.1");
//! ```

mod condition;
mod dataset;
mod ids;
mod level;
mod metadata;
mod options;
mod pagination;
mod parameter;
pub mod tag;

pub use condition::{Matching, MatchingCondition};
pub use dataset::{DataElement, Dataset};
pub use ids::{InternalKey, ObjectId, SeriesId, StudyId};
pub use level::QueryLevel;
pub use metadata::{InstanceMetadata, MediaLocation};
pub use options::QueryOptions;
pub use pagination::PagedResult;
pub use parameter::{DataParameter, find_parameter};
pub use tag::{Tag, Vr};
