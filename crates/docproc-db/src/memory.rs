//! In-memory implementation of the repository and search traits.
//!
//! Behaves like the PostgreSQL repositories closely enough to drive the
//! ingestion pipeline and the HTTP API in tests and local runs without a
//! database. The full-text index is simulated with lowercase word tokens:
//! a document matches when it contains every query word, and its rank is the
//! share of its tokens that are query words (always below 1).

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use docproc_core::{
    new_v7, normalize_tag_name, Document, DocumentDetail, DocumentRepository, DocumentSummary,
    Error, ListDocumentsRequest, ListDocumentsResponse, MatchSource, NewDocument,
    ProcessingState, Result, SearchCandidate, SearchConfig, SearchSource, Tag, TagRepository,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    doc: Document,
    state: Option<ProcessingState>,
    error_message: Option<String>,
    index: Option<Vec<String>>,
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<Uuid, StoredDocument>,
    tags: HashMap<Uuid, Tag>,
    links: BTreeSet<(Uuid, Uuid)>,
}

impl State {
    fn tags_for(&self, document_id: Uuid) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .links
            .iter()
            .filter(|(doc, _)| *doc == document_id)
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn require_document(&self, id: Uuid) -> Result<&StoredDocument> {
        self.documents
            .get(&id)
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))
    }

    fn require_tag(&self, id: Uuid) -> Result<&Tag> {
        self.tags
            .get(&id)
            .ok_or_else(|| Error::NotFound("Tag not found".to_string()))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

/// Documents, tags, and a simulated full-text index held in memory.
pub struct MemoryStore {
    state: RwLock<State>,
    snippet_length: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            state: RwLock::new(State::default()),
            snippet_length: config.snippet_length,
        }
    }

    /// Forget the pre-computed index of a document, as for rows stored before
    /// indexing existed.
    pub async fn drop_search_index(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;
        stored.index = None;
        Ok(())
    }

    /// Remove the processing status of a document.
    pub async fn clear_status(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;
        stored.state = None;
        stored.error_message = None;
        Ok(())
    }

    /// Override the creation time of a document.
    pub async fn set_created_at(&self, id: Uuid, created_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;
        stored.doc.created_at = created_at;
        Ok(())
    }

    fn candidate(&self, stored: &StoredDocument, source: MatchSource) -> SearchCandidate {
        let content = stored.doc.content.as_deref();
        SearchCandidate {
            document_id: stored.doc.id,
            filename: stored.doc.filename.clone(),
            created_at: stored.doc.created_at,
            source,
            highlight: None,
            content_prefix: content.map(|c| c.chars().take(self.snippet_length).collect()),
            content_chars: content.map(|c| c.chars().count() as i64).unwrap_or(0),
        }
    }
}

fn newest_first(a: &SearchCandidate, b: &SearchCandidate) -> std::cmp::Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.document_id.cmp(&b.document_id))
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn insert(&self, doc: NewDocument) -> Result<Document> {
        let mut state = self.state.write().await;
        if state.documents.contains_key(&doc.id) {
            return Err(Error::Conflict(format!("Document {} already exists", doc.id)));
        }
        if let Some(path) = &doc.storage_path {
            let taken = state
                .documents
                .values()
                .any(|d| d.doc.storage_path.as_ref() == Some(path));
            if taken {
                return Err(Error::Conflict("Storage path already in use".to_string()));
            }
        }

        let document = Document {
            id: doc.id,
            filename: doc.filename,
            storage_path: doc.storage_path,
            content: doc.content,
            file_size: doc.file_size,
            page_count: doc.page_count,
            created_at: Utc::now(),
        };
        let index = document.content.as_deref().map(tokenize);
        state.documents.insert(
            document.id,
            StoredDocument {
                doc: document.clone(),
                state: Some(doc.state),
                error_message: doc.error_message,
                index,
            },
        );
        Ok(document)
    }

    async fn fetch(&self, id: Uuid) -> Result<DocumentDetail> {
        let state = self.state.read().await;
        let stored = state.require_document(id)?;
        Ok(DocumentDetail {
            id,
            filename: stored.doc.filename.clone(),
            content: stored.doc.content.clone(),
            file_size: stored.doc.file_size,
            page_count: stored.doc.page_count,
            status: ProcessingState::label(stored.state),
            error_message: stored.error_message.clone(),
            indexed: stored.index.is_some(),
            created_at: stored.doc.created_at,
            tags: state.tags_for(id),
        })
    }

    async fn list(&self, req: ListDocumentsRequest) -> Result<ListDocumentsResponse> {
        let state = self.state.read().await;
        let mut docs: Vec<&StoredDocument> = state.documents.values().collect();
        docs.sort_by(|a, b| {
            b.doc
                .created_at
                .cmp(&a.doc.created_at)
                .then_with(|| b.doc.id.cmp(&a.doc.id))
        });

        let total = docs.len() as i64;
        let items = docs
            .into_iter()
            .skip(usize::try_from(req.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(req.page_size).unwrap_or(usize::MAX))
            .map(|stored| DocumentSummary {
                id: stored.doc.id,
                filename: stored.doc.filename.clone(),
                file_size: stored.doc.file_size,
                page_count: stored.doc.page_count,
                status: ProcessingState::label(stored.state),
                created_at: stored.doc.created_at,
                tags: state.tags_for(stored.doc.id),
            })
            .collect();

        Ok(ListDocumentsResponse::new(items, total, req))
    }

    async fn delete(&self, id: Uuid) -> Result<Document> {
        let mut state = self.state.write().await;
        let stored = state
            .documents
            .remove(&id)
            .ok_or_else(|| Error::NotFound("Document not found".to_string()))?;
        state.links.retain(|(doc, _)| *doc != id);
        Ok(stored.doc)
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.read().await.documents.contains_key(&id))
    }

    async fn backfill_search_index(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for stored in state.documents.values_mut() {
            if stored.index.is_none() {
                if let Some(content) = &stored.doc.content {
                    stored.index = Some(tokenize(content));
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn create(&self, name: &str) -> Result<Tag> {
        let name = normalize_tag_name(name)?;
        let mut state = self.state.write().await;
        let lowered = name.to_lowercase();
        if state.tags.values().any(|t| t.name.to_lowercase() == lowered) {
            return Err(Error::Conflict(format!("Tag '{}' already exists", name)));
        }
        let tag = Tag {
            id: new_v7(),
            name,
            created_at: Utc::now(),
        };
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get(&self, id: Uuid) -> Result<Tag> {
        self.state.read().await.require_tag(id).cloned()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if state.tags.remove(&id).is_none() {
            return Err(Error::NotFound("Tag not found".to_string()));
        }
        state.links.retain(|(_, tag)| *tag != id);
        Ok(())
    }

    async fn add_to_document(&self, document_id: Uuid, tag_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.require_document(document_id)?;
        state.require_tag(tag_id)?;
        if !state.links.insert((document_id, tag_id)) {
            return Err(Error::Conflict(
                "Tag already added to document".to_string(),
            ));
        }
        Ok(())
    }

    async fn remove_from_document(&self, document_id: Uuid, tag_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.require_document(document_id)?;
        state.require_tag(tag_id)?;
        if !state.links.remove(&(document_id, tag_id)) {
            return Err(Error::NotFound("Tag not found on document".to_string()));
        }
        Ok(())
    }

    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        state.require_document(document_id)?;
        Ok(state.tags_for(document_id))
    }
}

#[async_trait]
impl SearchSource for MemoryStore {
    async fn find_candidates(
        &self,
        query: &str,
        per_source_limit: usize,
    ) -> Result<Vec<SearchCandidate>> {
        let state = self.state.read().await;
        let needle = query.to_lowercase();
        let words = tokenize(query);

        let mut vector = Vec::new();
        let mut substring = Vec::new();
        let mut filename = Vec::new();
        let mut tagged = Vec::new();

        for stored in state.documents.values() {
            match &stored.index {
                Some(tokens) if !words.is_empty() => {
                    if words.iter().all(|w| tokens.contains(w)) {
                        let hits = tokens.iter().filter(|t| words.contains(t)).count();
                        let rank = hits as f64 / (tokens.len() + 1) as f64;
                        vector.push(self.candidate(stored, MatchSource::VectorMatch(rank)));
                    }
                }
                Some(_) => {}
                None => {
                    let matches = stored
                        .doc
                        .content
                        .as_ref()
                        .is_some_and(|c| c.to_lowercase().contains(&needle));
                    if matches {
                        substring.push(self.candidate(stored, MatchSource::SubstringFallback));
                    }
                }
            }

            if stored.doc.filename.to_lowercase().contains(&needle) {
                filename.push(self.candidate(stored, MatchSource::FilenameMatch));
            }

            let tag_hit = state
                .tags_for(stored.doc.id)
                .iter()
                .any(|t| t.name.to_lowercase().contains(&needle));
            if tag_hit {
                tagged.push(self.candidate(stored, MatchSource::TagMatch));
            }
        }

        vector.sort_by(|a, b| {
            b.source
                .score()
                .total_cmp(&a.source.score())
                .then_with(|| newest_first(a, b))
        });
        substring.sort_by(newest_first);
        filename.sort_by(newest_first);
        tagged.sort_by(newest_first);

        Ok([vector, substring, filename, tagged]
            .into_iter()
            .flat_map(|mut source| {
                source.truncate(per_source_limit);
                source
            })
            .collect())
    }
}
