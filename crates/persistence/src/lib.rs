//! PACS Archive Persistence Layer
//!
//! This crate provides the data-access layer of a medical-imaging object
//! archive: the store behind DICOM query, retrieve and storage services. It
//! accepts hierarchical identifiers and declarative matching conditions,
//! turns them into commands against a backend, and shapes the results.
//!
//! # Features
//!
//! - **Search**: Study, series and instance level matching with paging
//! - **Storage**: Instance insert with study/series creation and metadata
//! - **Metadata**: Retrieval at study, series and instance granularity
//! - **Deletes**: Key-resolved cascading deletes inside a transaction
//! - **Aggregates**: Modalities and related counts folded into results
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes
//!
//! # Architecture
//!
//! - [`types`] - Identifiers, conditions, datasets, metadata and paging types
//! - [`error`] - Error types for all operations
//! - [`core`] - Collaborator traits: backend, command adapter, schema provider,
//!   response builders and transaction scopes
//! - [`archive`] - The [`ObjectArchiveAccess`] orchestrator and aggregate
//!   enrichment
//! - [`backends`] - Backend implementations
//!
//! # Quick Start
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use pacs_persistence::archive::ObjectArchiveAccess;
//! use pacs_persistence::backends::sqlite::SqliteBackend;
//! use pacs_persistence::types::{
//!     tag, DataParameter, InstanceMetadata, MatchingCondition, ObjectId, QueryLevel,
//!     QueryOptions,
//! };
//!
//! let backend = Arc::new(SqliteBackend::in_memory()?);
//! backend.init_schema()?;
//! let archive = ObjectArchiveAccess::new(backend.clone(), backend.schema());
//!
//! let object = ObjectId::new("1.2.840.1", "1.2.840.1.1", "1.2.840.1.1.1");
//! let parameters = vec![
//!     DataParameter::single(tag::PATIENT_ID, "PAT-001"),
//!     DataParameter::single(tag::MODALITY, "CT"),
//! ];
//! let metadata = InstanceMetadata::new().with_media("application/dicom", None, "store/1.dcm");
//! archive.store_instance(&object, &parameters, Some(&metadata)).await?;
//!
//! let conditions = vec![MatchingCondition::parse(tag::PATIENT_ID, "PAT-*")?];
//! let page = archive
//!     .search_paged(&conditions, Some(&QueryOptions::paged(20, 0)), QueryLevel::Study)
//!     .await?;
//! assert_eq!(page.total_count, 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Matching
//!
//! Conditions follow DICOM attribute matching:
//!
//! ```
//! use pacs_persistence::types::{tag, Matching, MatchingCondition};
//!
//! let wildcard = MatchingCondition::parse(tag::PATIENT_NAME, "DOE^J*").unwrap();
//! assert!(matches!(wildcard.matching(), Matching::Wildcard { .. }));
//!
//! let range = MatchingCondition::parse(tag::STUDY_DATE, "20240101-20241231").unwrap();
//! assert!(matches!(range.matching(), Matching::Range { .. }));
//!
//! let universal = MatchingCondition::parse(tag::STUDY_DESCRIPTION, "").unwrap();
//! assert!(universal.is_universal());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod archive;
pub mod backends;
pub mod core;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use archive::{AggregateEnricher, ObjectArchiveAccess, StoreOutcome};
pub use error::{StorageError, StorageResult};
pub use types::{Dataset, InstanceMetadata, ObjectId, PagedResult, QueryLevel, SeriesId, StudyId};

// Re-export core traits
pub use core::{ArchiveBackend, Command, CommandAdapter, ResponseBuilder, SchemaProvider};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
