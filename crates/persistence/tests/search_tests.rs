//! Search and paging tests against SQLite.

mod common;

use pacs_persistence::types::{Dataset, MatchingCondition, QueryLevel, QueryOptions, Tag, tag};

use common::*;

fn uids(datasets: &[Dataset], key: Tag) -> Vec<String> {
    datasets
        .iter()
        .filter_map(|d| d.string(key).map(str::to_string))
        .collect()
}

fn parse(tag: Tag, value: &str) -> MatchingCondition {
    MatchingCondition::parse(tag, value).unwrap()
}

/// Five studies of one patient, dated 2024-01-01 .. 2024-01-05.
fn five_studies() -> Vec<InstanceFixture> {
    (1..=5)
        .map(|i| {
            InstanceFixture::new(format!("5.{i}"), format!("5.{i}.1"), format!("5.{i}.1.1"))
                .with_patient_id("PAT-5")
                .with_study_date(format!("2024010{i}"))
        })
        .collect()
}

// ============================================================================
// Matching Tests
// ============================================================================

#[tokio::test]
async fn test_search_without_conditions() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let studies = archive.search(&[], None, QueryLevel::Study).await.unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["1.1", "1.2"]);
}

#[tokio::test]
async fn test_universal_conditions_match_everything() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let conditions = vec![
        parse(tag::PATIENT_NAME, ""),
        parse(tag::STUDY_DESCRIPTION, "*"),
        MatchingCondition::universal(tag::MODALITY),
    ];
    let studies = archive
        .search(&conditions, None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(studies.len(), 2);
}

#[tokio::test]
async fn test_single_value_matching() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let studies = archive
        .search(&[parse(tag::PATIENT_ID, "PAT-2")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["1.2"]);

    let none = archive
        .search(&[parse(tag::PATIENT_ID, "PAT-3")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_wildcard_matching() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let studies = archive
        .search(&[parse(tag::PATIENT_NAME, "DOE^*")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["1.1"]);

    let studies = archive
        .search(&[parse(tag::PATIENT_NAME, "?OE^J*")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(studies.len(), 2);
}

#[tokio::test]
async fn test_wildcard_escapes_like_characters() {
    let archive = create_archive();
    store_all(
        &archive,
        &[
            InstanceFixture::new("7.1", "7.1.1", "7.1.1.1").with_study_description("100%_DONE"),
            InstanceFixture::new("7.2", "7.2.1", "7.2.1.1").with_study_description("100XXDONE"),
        ],
    )
    .await;

    let studies = archive
        .search(
            &[parse(tag::STUDY_DESCRIPTION, "100%_*")],
            None,
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["7.1"]);
}

#[tokio::test]
async fn test_date_range_matching() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let closed = archive
        .search(
            &[parse(tag::STUDY_DATE, "20240102-20240104")],
            None,
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(
        uids(&closed, tag::STUDY_INSTANCE_UID),
        vec!["5.2", "5.3", "5.4"]
    );

    let from = archive
        .search(&[parse(tag::STUDY_DATE, "20240104-")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&from, tag::STUDY_INSTANCE_UID), vec!["5.4", "5.5"]);

    let to = archive
        .search(&[parse(tag::STUDY_DATE, "-20240101")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&to, tag::STUDY_INSTANCE_UID), vec!["5.1"]);
}

#[test]
fn test_invalid_range_is_rejected() {
    assert!(MatchingCondition::parse(tag::STUDY_DATE, "-").is_err());
    assert!(MatchingCondition::parse(tag::STUDY_DATE, "20240101-20240102-20240103").is_err());
}

#[tokio::test]
async fn test_uid_list_matching() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let studies = archive
        .search(
            &[parse(tag::STUDY_INSTANCE_UID, "5.1\\5.3\\9.9")],
            None,
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["5.1", "5.3"]);
}

#[tokio::test]
async fn test_empty_uid_list_matches_nothing() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let empty: [&str; 0] = [];
    let studies = archive
        .search(
            &[MatchingCondition::uid_list(tag::STUDY_INSTANCE_UID, empty)],
            None,
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert!(studies.is_empty());
}

#[tokio::test]
async fn test_conditions_are_combined() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let conditions = vec![
        parse(tag::PATIENT_ID, "PAT-5"),
        parse(tag::STUDY_DATE, "20240103-"),
        parse(tag::STUDY_INSTANCE_UID, "5.1\\5.2\\5.3"),
    ];
    let studies = archive
        .search(&conditions, None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["5.3"]);
}

#[tokio::test]
async fn test_unmapped_attribute_is_ignored() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let manufacturer = Tag::new(0x0008, 0x0070);
    let studies = archive
        .search(
            &[MatchingCondition::single(manufacturer, "ACME")],
            None,
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(studies.len(), 2);
}

// ============================================================================
// Hierarchy Tests
// ============================================================================

#[tokio::test]
async fn test_series_search_by_study_attribute() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let series = archive
        .search(&[parse(tag::PATIENT_ID, "PAT-1")], None, QueryLevel::Series)
        .await
        .unwrap();
    assert_eq!(uids(&series, tag::SERIES_INSTANCE_UID), vec!["1.1.1", "1.1.2"]);
    // Series results carry their study attributes.
    assert_eq!(series[0].string(tag::STUDY_INSTANCE_UID), Some("1.1"));
    assert_eq!(series[0].string(tag::MODALITY), Some("CT"));
    assert!(!series[0].contains(tag::SOP_INSTANCE_UID));
}

#[tokio::test]
async fn test_instance_search_by_series_attribute() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let instances = archive
        .search(&[parse(tag::MODALITY, "CT")], None, QueryLevel::Instance)
        .await
        .unwrap();
    assert_eq!(
        uids(&instances, tag::SOP_INSTANCE_UID),
        vec!["1.1.1.1", "1.1.1.2"]
    );
    assert_eq!(instances[1].string(tag::INSTANCE_NUMBER), Some("2"));
    assert_eq!(instances[1].string(tag::PATIENT_ID), Some("PAT-1"));
}

#[tokio::test]
async fn test_study_search_by_series_attribute() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let studies = archive
        .search(&[parse(tag::MODALITY, "MR")], None, QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["1.1"]);
}

#[tokio::test]
async fn test_study_search_by_instance_attribute() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let studies = archive
        .search(
            &[parse(tag::SOP_INSTANCE_UID, "1.2.1.1")],
            None,
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["1.2"]);
}

#[tokio::test]
async fn test_series_search_within_study() {
    let archive = create_archive();
    store_all(&archive, &two_studies()).await;

    let conditions = vec![
        MatchingCondition::single(tag::STUDY_INSTANCE_UID, "1.1"),
        parse(tag::MODALITY, "M*"),
    ];
    let series = archive
        .search(&conditions, None, QueryLevel::Series)
        .await
        .unwrap();
    assert_eq!(uids(&series, tag::SERIES_INSTANCE_UID), vec!["1.1.2"]);
}

// ============================================================================
// Paging Tests
// ============================================================================

#[tokio::test]
async fn test_paged_search() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let first = archive
        .search_paged(&[], Some(&QueryOptions::paged(2, 0)), QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&first.items, tag::STUDY_INSTANCE_UID), vec!["5.1", "5.2"]);
    assert_eq!(first.total_count, 5);
    assert!(first.has_more());
    assert_eq!(first.next_offset(), Some(2));

    let last = archive
        .search_paged(&[], Some(&QueryOptions::paged(2, 4)), QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(uids(&last.items, tag::STUDY_INSTANCE_UID), vec!["5.5"]);
    assert_eq!(last.total_count, 5);
    assert!(!last.has_more());
}

#[tokio::test]
async fn test_first_page_of_many_studies() {
    let archive = create_archive();
    let studies: Vec<_> = (1..=25)
        .map(|i| InstanceFixture::new(format!("9.{i}"), format!("9.{i}.1"), format!("9.{i}.1.1")))
        .collect();
    store_all(&archive, &studies).await;

    let page = archive
        .search_paged(&[], Some(&QueryOptions::paged(10, 0)), QueryLevel::Study)
        .await
        .unwrap();
    assert_eq!(page.len(), 10);
    assert_eq!(page.total_count, 25);
    assert_eq!(page.items[0].string(tag::STUDY_INSTANCE_UID), Some("9.1"));
}

#[tokio::test]
async fn test_paged_search_total_respects_conditions() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let page = archive
        .search_paged(
            &[parse(tag::STUDY_DATE, "20240102-")],
            Some(&QueryOptions::paged(1, 1)),
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(uids(&page.items, tag::STUDY_INSTANCE_UID), vec!["5.3"]);
    assert_eq!(page.total_count, 4);
    assert_eq!(page.offset, 1);
    assert_eq!(page.limit, 1);
}

#[tokio::test]
async fn test_paged_search_past_the_end() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let page = archive
        .search_paged(&[], Some(&QueryOptions::paged(10, 20)), QueryLevel::Study)
        .await
        .unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total_count, 5);
}

#[tokio::test]
async fn test_unbounded_search_with_offset() {
    let archive = create_archive();
    store_all(&archive, &five_studies()).await;

    let studies = archive
        .search(
            &[],
            Some(&QueryOptions::new().with_offset(3)),
            QueryLevel::Study,
        )
        .await
        .unwrap();
    assert_eq!(uids(&studies, tag::STUDY_INSTANCE_UID), vec!["5.4", "5.5"]);
}

#[tokio::test]
async fn test_paged_search_requires_limit_and_offset() {
    let archive = create_archive();

    let err = archive
        .search_paged(&[], None, QueryLevel::Study)
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = archive
        .search_paged(&[], Some(&QueryOptions::new().with_limit(5)), QueryLevel::Study)
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());

    let err = archive
        .search_paged(&[], Some(&QueryOptions::paged(0, 0)), QueryLevel::Study)
        .await
        .unwrap_err();
    assert!(err.is_out_of_range());
}
