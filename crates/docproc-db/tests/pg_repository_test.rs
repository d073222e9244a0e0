//! PostgreSQL repository tests.
//!
//! Require a running database (see `DEFAULT_TEST_DATABASE_URL`); run with
//! `cargo test -p docproc-db -- --ignored`.

use docproc_db::test_fixtures::TestDatabase;
use docproc_db::{
    new_v7, DocumentRepository, Error, ListDocumentsRequest, MatchSource, NewDocument,
    ProcessingState, SearchSource, TagRepository,
};
use uuid::Uuid;

fn completed(filename: &str, content: &str) -> NewDocument {
    let id = new_v7();
    NewDocument {
        id,
        filename: filename.to_string(),
        storage_path: Some(format!("/tmp/docproc_test/{}_{}", id.simple(), filename)),
        content: Some(content.to_string()),
        file_size: content.len() as i64,
        page_count: Some(1),
        state: ProcessingState::Completed,
        error_message: None,
    }
}

fn sources_for(candidates: &[docproc_db::SearchCandidate], id: Uuid) -> Vec<&'static str> {
    let mut labels: Vec<_> = candidates
        .iter()
        .filter(|c| c.document_id == id)
        .map(|c| c.source.label())
        .collect();
    labels.sort();
    labels
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_insert_and_fetch_with_status() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    let doc = docs.insert(completed("report.pdf", "quarterly numbers")).await.unwrap();
    let detail = docs.fetch(doc.id).await.unwrap();

    assert_eq!(detail.filename, "report.pdf");
    assert_eq!(detail.status, "completed");
    assert_eq!(detail.page_count, Some(1));
    assert!(detail.indexed);
    assert!(docs.exists(doc.id).await.unwrap());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_failed_document_has_no_index() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    let mut new = completed("broken.pdf", "");
    new.storage_path = None;
    new.content = None;
    new.page_count = None;
    new.state = ProcessingState::Failed;
    new.error_message = Some("Corrupt document: bad xref".to_string());

    let doc = docs.insert(new).await.unwrap();
    let detail = docs.fetch(doc.id).await.unwrap();
    assert_eq!(detail.status, "failed");
    assert!(!detail.indexed);
    assert_eq!(
        detail.error_message.as_deref(),
        Some("Corrupt document: bad xref")
    );

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_missing_status_reads_unknown() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    let doc = docs.insert(completed("a.pdf", "text")).await.unwrap();
    sqlx::query("DELETE FROM processing_status WHERE document_id = $1")
        .bind(doc.id)
        .execute(&test_db.pool)
        .await
        .unwrap();

    assert_eq!(docs.fetch(doc.id).await.unwrap().status, "unknown");
    let page = docs.list(ListDocumentsRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].status, "unknown");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_delete_returns_record_and_cascades() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;
    let tags = &test_db.db.tags;

    let doc = docs.insert(completed("a.pdf", "text")).await.unwrap();
    let tag = tags.create("contracts").await.unwrap();
    tags.add_to_document(doc.id, tag.id).await.unwrap();

    let deleted = docs.delete(doc.id).await.unwrap();
    assert_eq!(deleted.storage_path, doc.storage_path);
    assert!(matches!(docs.delete(doc.id).await, Err(Error::NotFound(_))));
    // The tag survives, only the association is gone.
    assert_eq!(tags.get(tag.id).await.unwrap().name, "contracts");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_storage_path_is_immutable() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;

    let doc = test_db
        .db
        .documents
        .insert(completed("a.pdf", "text"))
        .await
        .unwrap();
    let result = sqlx::query("UPDATE document SET storage_path = '/elsewhere' WHERE id = $1")
        .bind(doc.id)
        .execute(&test_db.pool)
        .await;
    assert!(result.is_err());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_tag_conflicts_and_associations() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;
    let tags = &test_db.db.tags;

    let tag = tags.create("  Finance ").await.unwrap();
    assert_eq!(tag.name, "Finance");
    assert!(matches!(tags.create("FINANCE").await, Err(Error::Conflict(_))));
    assert!(matches!(tags.create("   ").await, Err(Error::InvalidInput(_))));

    let doc = docs.insert(completed("a.pdf", "text")).await.unwrap();
    tags.add_to_document(doc.id, tag.id).await.unwrap();
    assert!(matches!(
        tags.add_to_document(doc.id, tag.id).await,
        Err(Error::Conflict(_))
    ));
    assert!(matches!(
        tags.add_to_document(Uuid::now_v7(), tag.id).await,
        Err(Error::NotFound(_))
    ));

    assert_eq!(tags.list_for_document(doc.id).await.unwrap(), vec![tag.clone()]);
    tags.remove_from_document(doc.id, tag.id).await.unwrap();
    assert!(matches!(
        tags.remove_from_document(doc.id, tag.id).await,
        Err(Error::NotFound(_))
    ));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_candidates_from_every_source() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;
    let tags = &test_db.db.tags;

    let by_name = docs.insert(completed("café-menu.pdf", "lista de preços")).await.unwrap();
    let by_content = docs
        .insert(completed("notes.pdf", "encontro no café da esquina"))
        .await
        .unwrap();
    let by_tag = docs.insert(completed("receipt.pdf", "total 12")).await.unwrap();
    let tag = tags.create("Café").await.unwrap();
    tags.add_to_document(by_tag.id, tag.id).await.unwrap();

    let candidates = test_db.db.search.find_candidates("café", 100).await.unwrap();

    assert_eq!(sources_for(&candidates, by_name.id), vec!["filename"]);
    assert_eq!(sources_for(&candidates, by_content.id), vec!["vector"]);
    assert_eq!(sources_for(&candidates, by_tag.id), vec!["tag"]);

    let vector = candidates
        .iter()
        .find(|c| c.document_id == by_content.id)
        .unwrap();
    assert!(matches!(vector.source, MatchSource::VectorMatch(rank) if rank > 0.0));
    assert!(vector.highlight.is_some());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_substring_fallback_and_backfill() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    let doc = docs.insert(completed("a.pdf", "Contratação anual")).await.unwrap();
    sqlx::query("UPDATE document SET search_vector = NULL WHERE id = $1")
        .bind(doc.id)
        .execute(&test_db.pool)
        .await
        .unwrap();

    let candidates = test_db.db.search.find_candidates("contrat", 100).await.unwrap();
    assert_eq!(sources_for(&candidates, doc.id), vec!["substring"]);

    assert_eq!(docs.backfill_search_index().await.unwrap(), 1);
    assert!(docs.fetch(doc.id).await.unwrap().indexed);

    let candidates = test_db.db.search.find_candidates("contrat", 100).await.unwrap();
    assert!(sources_for(&candidates, doc.id)
        .iter()
        .all(|label| *label != "substring"));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_like_wildcards_are_literal() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    docs.insert(completed("plain.pdf", "text")).await.unwrap();
    let candidates = test_db.db.search.find_candidates("%", 100).await.unwrap();
    assert!(candidates.is_empty());

    test_db.cleanup().await;
}

fn oversized_text() -> String {
    // Distinct tokens push the tsvector past its 1 MiB ceiling.
    (0..300_000)
        .map(|i| format!("termo{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_oversized_content_is_stored_unindexed() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    let content = oversized_text();
    assert!(content.len() > 2 * 1024 * 1024);

    let doc = docs.insert(completed("big.pdf", &content)).await.unwrap();
    let detail = docs.fetch(doc.id).await.unwrap();
    assert_eq!(detail.status, "completed");
    assert!(!detail.indexed);
    assert_eq!(detail.content.as_deref(), Some(content.as_str()));

    let candidates = test_db.db.search.find_candidates("termo299999", 100).await.unwrap();
    assert_eq!(sources_for(&candidates, doc.id), vec!["substring"]);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_backfill_skips_oversized_rows() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let docs = &test_db.db.documents;

    let big = docs.insert(completed("big.pdf", &oversized_text())).await.unwrap();
    let small = docs.insert(completed("small.pdf", "acordo simples")).await.unwrap();
    sqlx::query("UPDATE document SET search_vector = NULL WHERE id = $1")
        .bind(small.id)
        .execute(&test_db.pool)
        .await
        .unwrap();

    assert_eq!(docs.backfill_search_index().await.unwrap(), 1);
    assert!(docs.fetch(small.id).await.unwrap().indexed);
    assert!(!docs.fetch(big.id).await.unwrap().indexed);

    test_db.cleanup().await;
}
