//! Derived study and series attributes.
//!
//! Search results carry only what is stored on the matched row. The attributes
//! computed over a study's or series' children are added afterwards by
//! [`AggregateEnricher`], using ordinary searches one level down.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::core::CommandAdapter;
use crate::error::StorageResult;
use crate::types::{Dataset, MatchingCondition, QueryLevel, Tag, Vr, tag};

use super::access::ObjectArchiveAccess;

/// Most UIDs put in one list condition. Keeps each child search well below
/// SQLite's bound parameter limit.
const SCOPE_CHUNK: usize = 500;

#[derive(Debug, Default)]
struct StudyAggregate {
    modalities: BTreeSet<String>,
    series: u64,
    instances: u64,
}

/// Folds child-level aggregates into study and series datasets.
///
/// | Level  | Attributes added |
/// |--------|------------------|
/// | Study  | ModalitiesInStudy, NumberOfStudyRelatedSeries, NumberOfStudyRelatedInstances |
/// | Series | NumberOfSeriesRelatedInstances |
#[derive(Debug)]
pub struct AggregateEnricher<'a, A: CommandAdapter> {
    archive: &'a ObjectArchiveAccess<A>,
}

impl<'a, A: CommandAdapter> AggregateEnricher<'a, A> {
    /// Creates an enricher searching through `archive`.
    pub fn new(archive: &'a ObjectArchiveAccess<A>) -> Self {
        Self { archive }
    }

    /// Enriches datasets returned by a search at `level`. Instance datasets
    /// are left unchanged.
    pub async fn enrich(&self, level: QueryLevel, datasets: &mut [Dataset]) -> StorageResult<()> {
        match level {
            QueryLevel::Study => self.enrich_studies(datasets).await,
            QueryLevel::Series => self.enrich_series(datasets).await,
            QueryLevel::Instance => Ok(()),
        }
    }

    /// Adds modalities and related series and instance counts to study datasets.
    pub async fn enrich_studies(&self, studies: &mut [Dataset]) -> StorageResult<()> {
        let scopes = uid_scopes(studies, tag::STUDY_INSTANCE_UID);
        if scopes.is_empty() {
            return Ok(());
        }

        let mut aggregates: HashMap<String, StudyAggregate> = HashMap::new();

        let series = self.search_scoped(&scopes, QueryLevel::Series).await?;
        for row in &series {
            let Some(study_uid) = row.string(tag::STUDY_INSTANCE_UID) else {
                continue;
            };
            let entry = aggregates.entry(study_uid.to_string()).or_default();
            entry.series += 1;
            if let Some(modality) = row.string(tag::MODALITY).filter(|m| !m.is_empty()) {
                entry.modalities.insert(modality.to_string());
            }
        }

        let instances = self.search_scoped(&scopes, QueryLevel::Instance).await?;
        for row in &instances {
            if let Some(study_uid) = row.string(tag::STUDY_INSTANCE_UID) {
                aggregates.entry(study_uid.to_string()).or_default().instances += 1;
            }
        }
        debug!(
            studies = studies.len(),
            series = series.len(),
            instances = instances.len(),
            "study aggregates computed"
        );

        for study in studies.iter_mut() {
            let Some(uid) = study.string(tag::STUDY_INSTANCE_UID).map(str::to_string) else {
                continue;
            };
            let aggregate = aggregates.remove(&uid).unwrap_or_default();
            study.insert(
                tag::MODALITIES_IN_STUDY,
                Vr::CS,
                aggregate.modalities.into_iter().collect(),
            );
            put_count(study, tag::NUMBER_OF_STUDY_RELATED_SERIES, aggregate.series);
            put_count(study, tag::NUMBER_OF_STUDY_RELATED_INSTANCES, aggregate.instances);
        }
        Ok(())
    }

    /// Adds the related instance count to series datasets.
    pub async fn enrich_series(&self, series: &mut [Dataset]) -> StorageResult<()> {
        let scopes = uid_scopes(series, tag::SERIES_INSTANCE_UID);
        if scopes.is_empty() {
            return Ok(());
        }

        let instances = self.search_scoped(&scopes, QueryLevel::Instance).await?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in &instances {
            if let Some(series_uid) = row.string(tag::SERIES_INSTANCE_UID) {
                *counts.entry(series_uid.to_string()).or_default() += 1;
            }
        }

        for dataset in series.iter_mut() {
            let Some(uid) = dataset.string(tag::SERIES_INSTANCE_UID).map(str::to_string) else {
                continue;
            };
            let count = counts.get(&uid).copied().unwrap_or(0);
            put_count(dataset, tag::NUMBER_OF_SERIES_RELATED_INSTANCES, count);
        }
        Ok(())
    }

    /// Runs one search at `level` per scope and concatenates the results.
    async fn search_scoped(
        &self,
        scopes: &[MatchingCondition],
        level: QueryLevel,
    ) -> StorageResult<Vec<Dataset>> {
        let mut results = Vec::new();
        for scope in scopes {
            let rows = self
                .archive
                .search(std::slice::from_ref(scope), None, level)
                .await?;
            results.extend(rows);
        }
        Ok(results)
    }
}

impl<A: CommandAdapter> ObjectArchiveAccess<A> {
    /// Returns an enricher for search results of this archive.
    pub fn aggregates(&self) -> AggregateEnricher<'_, A> {
        AggregateEnricher::new(self)
    }
}

/// UID list conditions covering every distinct `key` in `datasets`, at most
/// [`SCOPE_CHUNK`] UIDs each.
fn uid_scopes(datasets: &[Dataset], key: Tag) -> Vec<MatchingCondition> {
    let uids: Vec<&str> = datasets
        .iter()
        .filter_map(|d| d.string(key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    uids.chunks(SCOPE_CHUNK)
        .map(|chunk| MatchingCondition::uid_list(key, chunk.iter().copied()))
        .collect()
}

fn put_count(dataset: &mut Dataset, tag: Tag, count: u64) {
    dataset.insert(tag, Vr::IS, vec![count.to_string()]);
}
