//! Store wrappers for exercising failure and interleaving paths.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;

use super::{Document, DocumentStore, MemoryStore, Query, WriteOp};
use crate::{media::MemoryBlobStore, Directory, DirectoryConfig, ReadFailurePolicy};

/// Default-configured directory over `store` with the given read policy.
pub fn directory_over(store: impl DocumentStore + 'static, policy: ReadFailurePolicy) -> Directory {
    Directory::new(
        Arc::new(store),
        Arc::new(MemoryBlobStore::new()),
        DirectoryConfig::default(),
    )
    .with_read_failure_policy(policy)
}

/// Every call fails, as a backend outage would.
pub struct Unavailable;

#[async_trait]
impl DocumentStore for Unavailable {
    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>> {
        anyhow::bail!("backend unavailable")
    }

    async fn query(&self, _collection: &str, _query: &Query) -> Result<Vec<Document>> {
        anyhow::bail!("backend unavailable")
    }

    async fn commit(&self, _ops: Vec<WriteOp>) -> Result<()> {
        anyhow::bail!("backend unavailable")
    }
}

/// Memory store whose reads of one collection take a snapshot and then
/// sleep before answering, so the caller acts on a stale view. Commits are
/// never delayed.
pub struct SlowReads {
    inner: MemoryStore,
    collection: &'static str,
    delay: Duration,
}

impl SlowReads {
    pub fn new(collection: &'static str, delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            collection,
            delay,
        }
    }

    async fn pause<T>(&self, collection: &str, answer: T) -> T {
        if collection == self.collection {
            tokio::time::sleep(self.delay).await;
        }
        answer
    }
}

#[async_trait]
impl DocumentStore for SlowReads {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let answer = self.inner.get(collection, id).await;
        self.pause(collection, answer).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let answer = self.inner.query(collection, query).await;
        self.pause(collection, answer).await
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        self.inner.commit(ops).await
    }
}
