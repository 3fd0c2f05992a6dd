use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Fields, Query, WriteOp};
use crate::timestamp::now_ms;

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// Process-local document store. Used by tests and by the CLI when no
/// database path is configured.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let candidates: Vec<Document> = {
            let guard = self.collections.read().await;
            match guard.get(collection) {
                Some(docs) => docs
                    .iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect(),
                None => Vec::new(),
            }
        };
        Ok(query.run(candidates))
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut guard = self.collections.write().await;
        let now = now_ms();

        // Resolve every op against a staged view first; nothing touches the
        // live map unless the whole batch succeeds.
        let mut staged: HashMap<(String, String), Option<Fields>> = HashMap::new();
        for op in &ops {
            let key = (op.collection().to_string(), op.id().to_string());
            let current = match staged.get(&key) {
                Some(state) => state.clone(),
                None => guard
                    .get(op.collection())
                    .and_then(|docs| docs.get(op.id()))
                    .cloned(),
            };
            let next = op.resolve(current, now)?;
            staged.insert(key, next);
        }

        for ((collection, id), state) in staged {
            match state {
                Some(fields) => {
                    guard.entry(collection).or_default().insert(id, fields);
                },
                None => {
                    if let Some(docs) = guard.get_mut(&collection) {
                        docs.remove(&id);
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        error::{is_already_exists, is_not_found},
        store::{OrderBy, Patch},
    };

    #[tokio::test]
    async fn create_then_create_again_fails() {
        let store = MemoryStore::new();
        store
            .create("bookmarks", "bm-1", Patch::new().set("toolId", "t1"))
            .await
            .unwrap();
        let err = store
            .create("bookmarks", "bm-1", Patch::new().set("toolId", "t2"))
            .await
            .unwrap_err();
        assert!(is_already_exists(&err));
        let doc = store.get("bookmarks", "bm-1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("toolId"), Some("t1"));
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_trace() {
        let store = MemoryStore::new();
        store
            .set("tool_submissions", "s1", Patch::new().set("name", "Foo"))
            .await
            .unwrap();

        let err = store
            .commit(vec![
                WriteOp::Set {
                    collection: "tools".to_string(),
                    id: "s1".to_string(),
                    patch: Patch::new().set("name", "Foo"),
                },
                WriteOp::Delete {
                    collection: "tool_submissions".to_string(),
                    id: "s1".to_string(),
                },
                WriteOp::Update {
                    collection: "tools".to_string(),
                    id: "missing".to_string(),
                    patch: Patch::new().set("x", 1),
                },
            ])
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
        assert!(store.get("tools", "s1").await.unwrap().is_none());
        assert!(store.get("tool_submissions", "s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_update_needs_existing() {
        let store = MemoryStore::new();
        store.delete("tools", "nope").await.unwrap();
        let err = store
            .update("tools", "nope", Patch::new().set("name", "x"))
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("tools", "t1", Patch::new().set("viewCount", 0))
            .await
            .unwrap();

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .update("tools", "t1", Patch::new().increment("viewCount", 1))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let doc = store.get("tools", "t1").await.unwrap().unwrap();
        assert_eq!(doc.get("viewCount"), Some(&json!(25)));
    }

    #[tokio::test]
    async fn query_reads_only_the_named_collection() {
        let store = MemoryStore::new();
        store
            .set("tools", "a", Patch::new().set("createdAt", 1))
            .await
            .unwrap();
        store
            .set("blogs", "b", Patch::new().set("createdAt", 2))
            .await
            .unwrap();
        let out = store
            .query("tools", &Query::new().order_by(OrderBy::desc("createdAt")))
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
    }
}
