//! Admin subcommand handlers.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, bail};
use pacs_persistence::{ArchiveBackend, CommandAdapter};
use pacs_persistence::archive::ObjectArchiveAccess;
use pacs_persistence::types::{
    DataParameter, InstanceMetadata, MatchingCondition, ObjectId, QueryOptions, SeriesId,
    StudyId, Tag,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::config::{AdminCommand, AdminConfig};

/// A store request read from a JSON file.
///
/// ```json
/// {
///   "studyInstanceUid": "1.2.840.1",
///   "seriesInstanceUid": "1.2.840.1.1",
///   "sopInstanceUid": "1.2.840.1.1.1",
///   "attributes": { "PatientID": "PAT-1", "00080060": "CT", "StudyDescription": ["HEAD", "NECK"] },
///   "metadata": { "media": [{ "mediaType": "application/dicom", "location": "store/1.dcm" }] }
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRequest {
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub sop_instance_uid: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub metadata: Option<InstanceMetadata>,
}

/// One attribute value of a store request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl StoreRequest {
    /// Returns the object id.
    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(
            &self.study_instance_uid,
            &self.series_instance_uid,
            &self.sop_instance_uid,
        )
    }

    /// Converts the attributes to store parameters.
    pub fn parameters(&self) -> anyhow::Result<Vec<DataParameter>> {
        self.attributes
            .iter()
            .map(|(key, value)| {
                let tag = resolve_tag(key)?;
                let values = match value {
                    AttributeValue::Single(v) => vec![v.clone()],
                    AttributeValue::Multiple(vs) => vs.clone(),
                };
                Ok(DataParameter::new(tag, values))
            })
            .collect()
    }
}

fn resolve_tag(key: &str) -> anyhow::Result<Tag> {
    Tag::from_keyword(key).with_context(|| format!("unknown attribute '{}'", key))
}

/// Parses `KEYWORD=VALUE` filters into matching conditions.
pub fn parse_filters(filters: &[String]) -> anyhow::Result<Vec<MatchingCondition>> {
    filters
        .iter()
        .map(|filter| {
            let (key, value) = filter
                .split_once('=')
                .with_context(|| format!("filter '{}' is not KEYWORD=VALUE", filter))?;
            let tag = resolve_tag(key.trim())?;
            Ok(MatchingCondition::parse(tag, value)?)
        })
        .collect()
}

fn read_store_request(path: &Path) -> anyhow::Result<StoreRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid store request {}", path.display()))
}

/// Runs the configured subcommand and returns its JSON output.
pub async fn run<A: CommandAdapter>(
    archive: &ObjectArchiveAccess<A>,
    config: &AdminConfig,
) -> anyhow::Result<Value> {
    match &config.command {
        AdminCommand::Init => {
            archive.adapter().initialize().await?;
            info!(database = %config.database_url, "schema initialized");
            Ok(json!({ "initialized": true }))
        }

        AdminCommand::Store { file } => {
            let request = read_store_request(file)?;
            let object_id = request.object_id();
            let parameters = request.parameters()?;
            let outcome = archive
                .store_instance(&object_id, &parameters, request.metadata.as_ref())
                .await?;
            Ok(json!({
                "object": object_id.to_string(),
                "created": outcome.is_created(),
            }))
        }

        AdminCommand::Search {
            level,
            limit,
            offset,
            all,
            aggregates,
            filters,
        } => {
            let conditions = parse_filters(filters)?;
            let (mut items, total, limit) = if *all {
                let items = archive.search(&conditions, None, *level).await?;
                let total = items.len() as u64;
                (items, total, None)
            } else {
                let limit = limit.unwrap_or(config.default_page_size);
                let options = QueryOptions::paged(limit, *offset);
                let page = archive.search_paged(&conditions, Some(&options), *level).await?;
                (page.items, page.total_count, Some(limit))
            };
            if *aggregates {
                archive.aggregates().enrich(*level, &mut items).await?;
            }
            Ok(json!({
                "level": level.as_str(),
                "offset": offset,
                "limit": limit,
                "total": total,
                "items": items.iter().map(|d| d.to_dicom_json()).collect::<Vec<_>>(),
            }))
        }

        AdminCommand::Exists {
            study,
            series,
            instance,
        } => {
            let object_id = ObjectId::new(study, series, instance);
            Ok(json!({ "exists": archive.exists(&object_id).await? }))
        }

        AdminCommand::Metadata {
            study,
            series,
            instance,
        } => match (series, instance) {
            (None, None) => {
                let metadata = archive.get_study_metadata(&StudyId::new(study)).await?;
                Ok(serde_json::to_value(metadata)?)
            }
            (Some(series), None) => {
                let metadata = archive
                    .get_series_metadata(&SeriesId::new(study, series))
                    .await?;
                Ok(serde_json::to_value(metadata)?)
            }
            (Some(series), Some(instance)) => {
                let metadata = archive
                    .get_instance_metadata(&ObjectId::new(study, series, instance))
                    .await?;
                Ok(serde_json::to_value(metadata)?)
            }
            (None, Some(_)) => bail!("an instance UID requires a series UID"),
        },

        AdminCommand::DeleteStudy { study } => {
            let deleted = archive.delete_study(&StudyId::new(study)).await?;
            Ok(json!({ "deleted": deleted }))
        }

        AdminCommand::DeleteSeries { study, series } => {
            let deleted = archive
                .delete_series(&SeriesId::new(study, series))
                .await?;
            Ok(json!({ "deleted": deleted }))
        }

        AdminCommand::DeleteInstance {
            study,
            series,
            instance,
        } => {
            let deleted = archive
                .delete_instance(&ObjectId::new(study, series, instance))
                .await?;
            Ok(json!({ "deleted": deleted }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacs_persistence::types::{Matching, tag};

    #[test]
    fn test_parse_filters() {
        let filters = vec![
            "PatientID=PAT-1".to_string(),
            "StudyDate=20240101-".to_string(),
            "00080060=CT".to_string(),
        ];
        let conditions = parse_filters(&filters).unwrap();
        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0].tag(), tag::PATIENT_ID);
        assert!(matches!(conditions[1].matching(), Matching::Range { .. }));
        assert_eq!(conditions[2].tag(), tag::MODALITY);
    }

    #[test]
    fn test_parse_filters_rejects_bad_input() {
        assert!(parse_filters(&["PatientID".to_string()]).is_err());
        assert!(parse_filters(&["NotAKeyword=1".to_string()]).is_err());
    }

    #[test]
    fn test_store_request() {
        let request: StoreRequest = serde_json::from_value(json!({
            "studyInstanceUid": "1.2",
            "seriesInstanceUid": "1.2.3",
            "sopInstanceUid": "1.2.3.4",
            "attributes": {
                "PatientID": "PAT-1",
                "StudyDescription": ["HEAD", "NECK"]
            }
        }))
        .unwrap();

        assert_eq!(request.object_id().to_string(), "1.2/1.2.3/1.2.3.4");
        let parameters = request.parameters().unwrap();
        let description = parameters
            .iter()
            .find(|p| p.tag == tag::STUDY_DESCRIPTION)
            .unwrap();
        assert_eq!(description.values, vec!["HEAD", "NECK"]);
        assert!(request.metadata.is_none());
    }
}
