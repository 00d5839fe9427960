//! Test fixtures for archive testing.
//!
//! [`InstanceFixture`] describes one instance with the attributes the standard
//! schema stores; [`create_archive`] returns an archive over a fresh in-memory
//! SQLite database.

use std::sync::Arc;

use pacs_persistence::archive::ObjectArchiveAccess;
use pacs_persistence::backends::sqlite::SqliteBackend;
use pacs_persistence::types::{DataParameter, InstanceMetadata, ObjectId, tag};

/// An instance to store.
#[derive(Debug, Clone)]
pub struct InstanceFixture {
    pub study_uid: String,
    pub series_uid: String,
    pub sop_uid: String,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub study_date: Option<String>,
    pub study_description: Option<String>,
    pub modality: String,
    pub instance_number: Option<String>,
    pub metadata: Option<InstanceMetadata>,
}

impl InstanceFixture {
    /// Creates a CT instance of patient `PAT-1`.
    pub fn new(
        study_uid: impl Into<String>,
        series_uid: impl Into<String>,
        sop_uid: impl Into<String>,
    ) -> Self {
        Self {
            study_uid: study_uid.into(),
            series_uid: series_uid.into(),
            sop_uid: sop_uid.into(),
            patient_id: "PAT-1".to_string(),
            patient_name: None,
            study_date: None,
            study_description: None,
            modality: "CT".to_string(),
            instance_number: None,
            metadata: None,
        }
    }

    pub fn with_patient_id(mut self, id: impl Into<String>) -> Self {
        self.patient_id = id.into();
        self
    }

    pub fn with_patient_name(mut self, name: impl Into<String>) -> Self {
        self.patient_name = Some(name.into());
        self
    }

    pub fn with_study_date(mut self, date: impl Into<String>) -> Self {
        self.study_date = Some(date.into());
        self
    }

    pub fn with_study_description(mut self, description: impl Into<String>) -> Self {
        self.study_description = Some(description.into());
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = modality.into();
        self
    }

    pub fn with_instance_number(mut self, number: impl Into<String>) -> Self {
        self.instance_number = Some(number.into());
        self
    }

    /// Attaches metadata pointing at `location`.
    pub fn with_media(mut self, location: impl Into<String>) -> Self {
        self.metadata = Some(
            InstanceMetadata::new()
                .with_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
                .with_media("application/dicom", None, location),
        );
        self
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(&self.study_uid, &self.series_uid, &self.sop_uid)
    }

    /// Returns the store parameters, UIDs included.
    pub fn parameters(&self) -> Vec<DataParameter> {
        let mut params = vec![
            DataParameter::single(tag::STUDY_INSTANCE_UID, &self.study_uid),
            DataParameter::single(tag::SERIES_INSTANCE_UID, &self.series_uid),
            DataParameter::single(tag::SOP_INSTANCE_UID, &self.sop_uid),
            DataParameter::single(tag::PATIENT_ID, &self.patient_id),
            DataParameter::single(tag::MODALITY, &self.modality),
        ];
        let optional = [
            (tag::PATIENT_NAME, &self.patient_name),
            (tag::STUDY_DATE, &self.study_date),
            (tag::STUDY_DESCRIPTION, &self.study_description),
            (tag::INSTANCE_NUMBER, &self.instance_number),
        ];
        for (attribute, value) in optional {
            if let Some(value) = value {
                params.push(DataParameter::single(attribute, value));
            }
        }
        params
    }
}

/// Creates an in-memory SQLite backend with the schema installed.
pub fn create_backend() -> Arc<SqliteBackend> {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    Arc::new(backend)
}

/// Creates an archive over a fresh in-memory database.
pub fn create_archive() -> ObjectArchiveAccess<SqliteBackend> {
    let backend = create_backend();
    ObjectArchiveAccess::new(backend.clone(), backend.schema())
}

/// Stores every fixture, panicking on failure.
pub async fn store_all<A>(archive: &ObjectArchiveAccess<A>, fixtures: &[InstanceFixture])
where
    A: pacs_persistence::CommandAdapter,
{
    for fixture in fixtures {
        archive
            .store_instance(
                &fixture.object_id(),
                &fixture.parameters(),
                fixture.metadata.as_ref(),
            )
            .await
            .expect("Failed to store instance");
    }
}

/// Two studies of two patients:
///
/// - `1.1` (PAT-1, DOE^JOHN, 20240115): series `1.1.1` CT with two instances,
///   series `1.1.2` MR with one instance
/// - `1.2` (PAT-2, ROE^JANE, 20240320): series `1.2.1` US with one instance
pub fn two_studies() -> Vec<InstanceFixture> {
    let first = |series: &str, sop: &str| {
        InstanceFixture::new("1.1", series, sop)
            .with_patient_id("PAT-1")
            .with_patient_name("DOE^JOHN")
            .with_study_date("20240115")
            .with_study_description("HEAD CT")
    };
    vec![
        first("1.1.1", "1.1.1.1")
            .with_instance_number("1")
            .with_media("store/1.1.1.1.dcm"),
        first("1.1.1", "1.1.1.2")
            .with_instance_number("2")
            .with_media("store/1.1.1.2.dcm"),
        first("1.1.2", "1.1.2.1")
            .with_modality("MR")
            .with_media("store/1.1.2.1.dcm"),
        InstanceFixture::new("1.2", "1.2.1", "1.2.1.1")
            .with_patient_id("PAT-2")
            .with_patient_name("ROE^JANE")
            .with_study_date("20240320")
            .with_study_description("ABDOMEN US")
            .with_modality("US")
            .with_media("store/1.2.1.1.dcm"),
    ]
}
