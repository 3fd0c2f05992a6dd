use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use super::{Document, DocumentStore, Fields, FilterOp, Query, WriteOp};
use crate::timestamp::now_ms;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);
";

/// Document store persisted as JSON bodies in a single SQLite table.
///
/// All access goes through one connection behind a mutex and runs on the
/// blocking pool. Batches and increments execute inside a transaction.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&path)
                .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
                .context("failed to apply sqlite pragmas")?;
            conn.execute_batch(SCHEMA_SQL)
                .context("failed to create documents table")?;
            Ok(conn)
        })
        .await
        .context("sqlite open task join failed")??;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite")?;
        conn.execute_batch(SCHEMA_SQL)
            .context("failed to create documents table")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| anyhow!("sqlite connection lock poisoned"))?;
            f(&mut guard)
        })
        .await
        .context("sqlite task join failed")?
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.with_conn(move |conn| {
            let fields = read_fields(conn, &collection, &id)?;
            Ok(fields.map(|fields| Document::new(id, fields)))
        })
        .await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let collection = collection.to_string();
        let query = query.clone();
        self.with_conn(move |conn| {
            let candidates = load_candidates(conn, &collection, &query)?;
            Ok(query.run(candidates))
        })
        .await
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().context("failed to begin transaction")?;
            let now = now_ms();
            for op in &ops {
                let current = read_fields(&tx, op.collection(), op.id())?;
                match op.resolve(current, now)? {
                    Some(fields) => {
                        let body = serde_json::to_string(&fields)
                            .context("failed to encode document body")?;
                        tx.execute(
                            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
                             ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body",
                            params![op.collection(), op.id(), body],
                        )
                        .with_context(|| {
                            format!("failed to write document {}/{}", op.collection(), op.id())
                        })?;
                    },
                    None => {
                        tx.execute(
                            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                            params![op.collection(), op.id()],
                        )
                        .with_context(|| {
                            format!("failed to delete document {}/{}", op.collection(), op.id())
                        })?;
                    },
                }
            }
            tx.commit().context("failed to commit transaction")?;
            Ok(())
        })
        .await
    }
}

fn read_fields(conn: &Connection, collection: &str, id: &str) -> Result<Option<Fields>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to read document {collection}/{id}"))?;
    body.map(|body| decode_body(&body, id)).transpose()
}

fn decode_body(body: &str, id: &str) -> Result<Fields> {
    match serde_json::from_str::<Value>(body)
        .with_context(|| format!("corrupt document body for {id}"))?
    {
        Value::Object(fields) => Ok(fields),
        _ => Ok(Fields::new()),
    }
}

/// Loads the collection, pushing string equality filters down into SQL. The
/// evaluator re-checks every filter afterwards.
fn load_candidates(conn: &Connection, collection: &str, query: &Query) -> Result<Vec<Document>> {
    let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?1");
    let mut args = vec![collection.to_string()];
    for filter in &query.filters {
        if filter.op != FilterOp::Eq || !is_plain_field(&filter.field) {
            continue;
        }
        if let Value::String(expected) = &filter.value {
            args.push(expected.clone());
            sql.push_str(&format!(
                " AND json_extract(body, '$.{}') = ?{}",
                filter.field,
                args.len()
            ));
        }
    }

    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare collection scan")?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .with_context(|| format!("failed to scan collection {collection}"))?;

    let mut docs = Vec::new();
    for row in rows {
        let (id, body) = row.context("failed to read document row")?;
        let fields = decode_body(&body, &id)?;
        docs.push(Document::new(id, fields));
    }
    Ok(docs)
}

fn is_plain_field(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        error::is_not_found,
        store::{OrderBy, Patch},
    };

    #[tokio::test]
    async fn round_trips_documents_through_json_bodies() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .set(
                "tools",
                "t1",
                Patch::new()
                    .set("name", "Alpha")
                    .set("tags", json!(["ai"]))
                    .server_timestamp("createdAt"),
            )
            .await
            .unwrap();
        let doc = store.get("tools", "t1").await.unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("Alpha"));
        assert!(doc.get("createdAt").and_then(Value::as_i64).is_some());
        assert!(store.get("tools", "t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pushed_down_filters_agree_with_evaluator() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (id, status, created) in [("a", "active", 3), ("b", "inactive", 2), ("c", "active", 1)] {
            store
                .set(
                    "tools",
                    id,
                    Patch::new().set("status", status).set("createdAt", created),
                )
                .await
                .unwrap();
        }
        store
            .set("tools", "n", Patch::new().set("status", 1).set("createdAt", 9))
            .await
            .unwrap();

        let out = store
            .query(
                "tools",
                &Query::new()
                    .where_eq("status", "active")
                    .order_by(OrderBy::desc("createdAt")),
            )
            .await
            .unwrap();
        let ids: Vec<_> = out.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn batch_rolls_back_on_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .set("tool_submissions", "s1", Patch::new().set("name", "Foo"))
            .await
            .unwrap();
        let err = store
            .commit(vec![
                WriteOp::Delete {
                    collection: "tool_submissions".to_string(),
                    id: "s1".to_string(),
                },
                WriteOp::Update {
                    collection: "tools".to_string(),
                    id: "ghost".to_string(),
                    patch: Patch::new().set("x", 1),
                },
            ])
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
        assert!(store.get("tool_submissions", "s1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn increments_accumulate_in_transactions() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .set("tools", "t1", Patch::new().set("viewCount", 0))
            .await
            .unwrap();
        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
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
        assert_eq!(doc.get("viewCount"), Some(&json!(10)));
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_reopen() {
        let dir = std::env::temp_dir()
            .join(format!("toolshelf-sqlite-{}", crate::store::new_document_id()));
        let path = dir.join("docs.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store
                .set("categories", "text", Patch::new().set("name", "Text"))
                .await
                .unwrap();
        }
        let reopened = SqliteStore::open(&path).await.unwrap();
        let doc = reopened.get("categories", "text").await.unwrap().unwrap();
        assert_eq!(doc.get_str("name"), Some("Text"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
