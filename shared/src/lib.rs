//! Data access layer for the toolshelf AI tools directory.
//!
//! [`Directory`] is the entry point: it wraps a [`store::DocumentStore`] and a
//! [`media::BlobStore`] and exposes the catalog, blog, category, bookmark,
//! intake and moderation operations. Each concern lives in its own module as
//! an `impl Directory` block.

pub mod blog;
pub mod bookmarks;
pub mod categories;
pub mod config;
pub mod error;
pub mod identity;
pub mod import;
pub mod intake;
pub mod logging;
pub mod media;
pub mod models;
pub mod pagination;
pub mod search;
pub mod store;
pub mod submissions;
pub mod text;
pub mod timestamp;
pub mod tools;

use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;

pub use crate::{
    config::{DirectoryConfig, ReadFailurePolicy, SearchMode},
    error::DirectoryError,
    identity::Session,
};
use crate::{
    media::{BlobStore, LocalBlobStore, MemoryBlobStore},
    search::SearchIndex,
    store::{Document, DocumentStore, MemoryStore, SqliteStore},
};

/// Persisted collection names.
pub mod collections {
    pub const TOOLS: &str = "tools";
    pub const TOOL_SUBMISSIONS: &str = "tool_submissions";
    pub const BLOG_POSTS: &str = "blog_posts";
    pub const LEGACY_BLOGS: &str = "blogs";
    pub const CATEGORIES: &str = "categories";
    pub const BOOKMARKS: &str = "bookmarks";
    pub const FEEDBACK: &str = "feedback";
    pub const TOOL_REPORTS: &str = "toolReports";
    pub const CONTACTS: &str = "contacts";

    pub const ALL: &[&str] = &[
        TOOLS,
        TOOL_SUBMISSIONS,
        BLOG_POSTS,
        LEGACY_BLOGS,
        CATEGORIES,
        BOOKMARKS,
        FEEDBACK,
        TOOL_REPORTS,
        CONTACTS,
    ];
}

pub struct Directory {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    config: DirectoryConfig,
    search_index: SearchIndex,
}

impl Directory {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            config,
            search_index: SearchIndex::default(),
        }
    }

    /// SQLite document store at `config.db_path`, blobs under
    /// `config.media_dir`.
    pub async fn open(config: DirectoryConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.db_path).await?;
        let blobs = LocalBlobStore::new(&config.media_dir, config.media_base_url.clone());
        tracing::info!(db = %config.db_path.display(), "opened directory store");
        Ok(Self::new(Arc::new(store), Arc::new(blobs), config))
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryBlobStore::new()),
            DirectoryConfig::default(),
        )
    }

    pub fn with_read_failure_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.config.read_failure_policy = policy;
        self
    }

    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.config.search_mode = mode;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.search_index
    }

    /// Applies the read-failure policy to a soft read.
    pub(crate) fn degrade<T: Default>(&self, what: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => match self.config.read_failure_policy {
                ReadFailurePolicy::Propagate => Err(err),
                ReadFailurePolicy::Degrade => {
                    tracing::error!("{what} failed, returning empty result: {err:#}");
                    Ok(T::default())
                },
            },
        }
    }

    /// Decodes documents, skipping (and logging) any that do not fit `T`.
    pub(crate) fn decode_all<T: DeserializeOwned>(
        &self,
        collection: &str,
        docs: &[Document],
    ) -> Vec<T> {
        docs.iter()
            .filter_map(|doc| match doc.decode::<T>() {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!("skipping undecodable {collection}/{}: {err:#}", doc.id);
                    None
                },
            })
            .collect()
    }
}
