//! Tool search over name, description and tags.
//!
//! Three strategies, chosen by [`SearchMode`]:
//! - `Scan` loads the catalog and keeps documents where any searchable
//!   field contains the lowercased term.
//! - `Prefix` issues one store query per field (a `[term, term + U+FFFF)`
//!   range on name and description, exact membership on tags) and merges the
//!   hits by id. Matching is case-sensitive on stored values.
//! - `Indexed` keeps a trigram index over the lowercased fields, built from
//!   one scan on first use and maintained by this crate's tool writes.
//!   Candidates are re-checked by substring, so results equal `Scan`.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    collections::TOOLS,
    config::SearchMode,
    models::Tool,
    store::{Document, Filter, FilterOp, Query},
    Directory,
};

const PREFIX_SENTINEL: char = '\u{FFFF}';
const GRAM: usize = 3;

/// Lowercased searchable texts of one tool document, one entry per field
/// value. Substrings never span two entries.
pub fn searchable_texts(doc: &Document) -> Vec<String> {
    let mut texts = Vec::new();
    for field in ["name", "description"] {
        if let Some(text) = doc.get_str(field) {
            texts.push(text.to_lowercase());
        }
    }
    if let Some(Value::Array(tags)) = doc.get("tags") {
        texts.extend(tags.iter().filter_map(Value::as_str).map(str::to_lowercase));
    }
    texts
}

/// Case-insensitive containment in name, description or any single tag.
pub fn matches_term(doc: &Document, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    !needle.is_empty() && searchable_texts(doc).iter().any(|text| text.contains(&needle))
}

fn trigrams(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(GRAM)
        .map(|window| window.iter().collect())
        .collect()
}

#[derive(Debug, Default)]
struct TrigramIndex {
    postings: HashMap<String, HashSet<String>>,
    texts: HashMap<String, Vec<String>>,
}

impl TrigramIndex {
    fn insert(&mut self, doc: &Document) {
        self.remove(&doc.id);
        let texts = searchable_texts(doc);
        for text in &texts {
            for gram in trigrams(text) {
                self.postings.entry(gram).or_default().insert(doc.id.clone());
            }
        }
        self.texts.insert(doc.id.clone(), texts);
    }

    fn remove(&mut self, id: &str) {
        let Some(texts) = self.texts.remove(id) else {
            return;
        };
        for text in &texts {
            for gram in trigrams(text) {
                if let Some(ids) = self.postings.get_mut(&gram) {
                    ids.remove(id);
                    if ids.is_empty() {
                        self.postings.remove(&gram);
                    }
                }
            }
        }
    }

    /// Ids whose texts contain `needle` (already lowercased, at least
    /// [`GRAM`] chars).
    fn lookup(&self, needle: &str) -> Vec<String> {
        let grams = trigrams(needle);
        let mut posting_lists: Vec<&HashSet<String>> = Vec::with_capacity(grams.len());
        for gram in &grams {
            match self.postings.get(gram) {
                Some(ids) => posting_lists.push(ids),
                None => return Vec::new(),
            }
        }
        posting_lists.sort_by_key(|ids| ids.len());
        let Some((smallest, rest)) = posting_lists.split_first() else {
            return Vec::new();
        };
        let mut hits: Vec<String> = smallest
            .iter()
            .filter(|id| rest.iter().all(|ids| ids.contains(*id)))
            .filter(|id| {
                self.texts
                    .get(*id)
                    .is_some_and(|texts| texts.iter().any(|t| t.contains(needle)))
            })
            .cloned()
            .collect();
        hits.sort();
        hits
    }
}

/// Lazily built trigram index shared by a [`Directory`].
#[derive(Debug, Default)]
pub struct SearchIndex {
    inner: RwLock<Option<TrigramIndex>>,
}

impl SearchIndex {
    pub async fn is_built(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Updates an already-built index; a cold index is left cold.
    pub async fn upsert(&self, doc: &Document) {
        if let Some(index) = self.inner.write().await.as_mut() {
            index.insert(doc);
        }
    }

    pub async fn remove(&self, id: &str) {
        if let Some(index) = self.inner.write().await.as_mut() {
            index.remove(id);
        }
    }
}

impl Directory {
    /// Soft read: honours the read-failure policy. An empty or
    /// whitespace-only query returns no tools.
    pub async fn search_tools(&self, query: &str) -> Result<Vec<Tool>> {
        let result = self.search_tool_documents(query).await;
        let docs = self.degrade("tool search", result)?;
        Ok(self.decode_all(TOOLS, &docs))
    }

    /// Raw search hits keyed and deduplicated by id, errors propagated.
    pub async fn search_tool_documents(&self, query: &str) -> Result<Vec<Document>> {
        let term = query.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let mode = self.config().search_mode;
        tracing::debug!(term, ?mode, "searching tools");
        match mode {
            SearchMode::Scan => self.scan_search(term).await,
            SearchMode::Prefix => self.prefix_search(term).await,
            SearchMode::Indexed => self.indexed_search(term).await,
        }
    }

    async fn scan_search(&self, term: &str) -> Result<Vec<Document>> {
        let all = self
            .store()
            .query(TOOLS, &Query::new())
            .await
            .context("failed to scan tools for search")?;
        Ok(all.into_iter().filter(|doc| matches_term(doc, term)).collect())
    }

    async fn prefix_search(&self, term: &str) -> Result<Vec<Document>> {
        let upper = format!("{term}{PREFIX_SENTINEL}");
        let range = |field: &str| {
            Query::new()
                .filter(Filter::new(field, FilterOp::Ge, term))
                .filter(Filter::new(field, FilterOp::Lt, upper.as_str()))
        };
        let by_name = range("name");
        let by_description = range("description");
        let by_tag = Query::new().filter(Filter::new("tags", FilterOp::ArrayContains, term));

        let store = self.store();
        let (names, descriptions, tags) = futures::try_join!(
            store.query(TOOLS, &by_name),
            store.query(TOOLS, &by_description),
            store.query(TOOLS, &by_tag),
        )
        .context("prefix search query failed")?;

        let merged: BTreeMap<String, Document> = names
            .into_iter()
            .chain(descriptions)
            .chain(tags)
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        Ok(merged.into_values().collect())
    }

    async fn indexed_search(&self, term: &str) -> Result<Vec<Document>> {
        let needle = term.to_lowercase();
        if needle.chars().count() < GRAM {
            return self.scan_search(term).await;
        }
        self.ensure_search_index().await?;

        let ids = match self.search_index().inner.read().await.as_ref() {
            Some(index) => index.lookup(&needle),
            None => return self.scan_search(term).await,
        };
        let store = self.store();
        let fetched = try_join_all(ids.iter().map(|id| store.get(TOOLS, id)))
            .await
            .context("failed to load indexed search hits")?;
        // Re-verify against the stored document in case another writer changed it.
        Ok(fetched
            .into_iter()
            .flatten()
            .filter(|doc| matches_term(doc, term))
            .collect())
    }

    /// Builds the index on first use. The write lock is held across the
    /// catalog scan so a tool write racing the build waits in
    /// `reindex_tool` until the index exists, then applies itself on top.
    async fn ensure_search_index(&self) -> Result<()> {
        if self.search_index().is_built().await {
            return Ok(());
        }
        let mut guard = self.search_index().inner.write().await;
        if guard.is_some() {
            return Ok(());
        }
        let all = self
            .store()
            .query(TOOLS, &Query::new())
            .await
            .context("failed to load tools for search index")?;
        let mut index = TrigramIndex::default();
        for doc in &all {
            index.insert(doc);
        }
        tracing::info!(
            documents = all.len(),
            grams = index.postings.len(),
            "built tool search index"
        );
        *guard = Some(index);
        Ok(())
    }
}
