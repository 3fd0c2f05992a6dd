//! Document store seam.
//!
//! The rest of the crate talks to a collection-scoped document database
//! through [`DocumentStore`]. Two backends ship with the crate: an in-process
//! [`MemoryStore`] and a file-backed [`SqliteStore`]. Both share the query
//! evaluator in [`query`] and the write semantics in this module so they are
//! observably identical.

pub mod memory;
pub mod query;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod testing;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

pub use self::{
    memory::MemoryStore,
    query::{Direction, Filter, FilterOp, OrderBy, Query, StartAfter},
    sqlite::SqliteStore,
};
use crate::error::DirectoryError;

pub type Fields = Map<String, Value>;

const AUTO_ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Decodes the document into `T`, exposing the document id as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .with_context(|| format!("failed to decode document {}", self.id))
    }
}

/// One field-level write, resolved by the store at commit time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    Value(Value),
    /// Store clock, written as epoch milliseconds.
    ServerTimestamp,
    /// Atomic numeric delta. A missing or non-numeric field counts as zero.
    Increment(i64),
    Delete,
}

/// Ordered set of field writes applied to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    entries: Vec<(String, FieldWrite)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self {
            entries: fields
                .into_iter()
                .map(|(k, v)| (k, FieldWrite::Value(v)))
                .collect(),
        }
    }

    /// Serializes `value` (which must encode as a JSON object) into plain
    /// field writes.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value).context("failed to encode document fields")? {
            Value::Object(fields) => Ok(Self::from_fields(fields)),
            other => anyhow::bail!("document fields must encode as an object, got {other}"),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.push(field, FieldWrite::Value(value.into()));
        self
    }

    pub fn server_timestamp(mut self, field: &str) -> Self {
        self.push(field, FieldWrite::ServerTimestamp);
        self
    }

    pub fn increment(mut self, field: &str, by: i64) -> Self {
        self.push(field, FieldWrite::Increment(by));
        self
    }

    pub fn remove(mut self, field: &str) -> Self {
        self.push(field, FieldWrite::Delete);
        self
    }

    /// Drops every pending write that targets `field`.
    pub fn without(mut self, field: &str) -> Self {
        self.entries.retain(|(name, _)| name != field);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    fn push(&mut self, field: &str, write: FieldWrite) {
        self.entries.retain(|(name, _)| name != field);
        self.entries.push((field.to_string(), write));
    }

    /// Applies the writes on top of `target`. `id` is never stored as a
    /// field; the document key is authoritative.
    pub fn apply(&self, target: &mut Fields, now_ms: i64) {
        for (field, write) in &self.entries {
            if field == "id" {
                continue;
            }
            match write {
                FieldWrite::Value(value) => {
                    target.insert(field.clone(), value.clone());
                },
                FieldWrite::ServerTimestamp => {
                    target.insert(field.clone(), Value::from(now_ms));
                },
                FieldWrite::Increment(by) => {
                    let next = match target.get(field) {
                        Some(Value::Number(n)) if n.is_i64() => {
                            Value::from(n.as_i64().unwrap_or_default().saturating_add(*by))
                        },
                        Some(Value::Number(n)) => Value::from(n.as_f64().unwrap_or_default() + *by as f64),
                        _ => Value::from(*by),
                    };
                    target.insert(field.clone(), next);
                },
                FieldWrite::Delete => {
                    target.remove(field);
                },
            }
        }
    }
}

/// One operation of an atomic [`DocumentStore::commit`] batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Create { collection: String, id: String, patch: Patch },
    Set { collection: String, id: String, patch: Patch },
    Update { collection: String, id: String, patch: Patch },
    Delete { collection: String, id: String },
    /// Writes nothing. Fails the batch with not-found when the document is
    /// missing, or with an invalid transition to `to` when `field` currently
    /// holds `forbidden`.
    Guard {
        collection: String,
        id: String,
        field: String,
        forbidden: Value,
        to: String,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Set { collection, .. }
            | WriteOp::Update { collection, .. }
            | WriteOp::Delete { collection, .. }
            | WriteOp::Guard { collection, .. } => collection,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            WriteOp::Create { id, .. }
            | WriteOp::Set { id, .. }
            | WriteOp::Update { id, .. }
            | WriteOp::Delete { id, .. }
            | WriteOp::Guard { id, .. } => id,
        }
    }

    /// Computes the post-write state of one document. `None` means the
    /// document does not exist afterwards.
    pub(crate) fn resolve(&self, current: Option<Fields>, now_ms: i64) -> Result<Option<Fields>> {
        match self {
            WriteOp::Create { collection, id, patch } => {
                if current.is_some() {
                    return Err(DirectoryError::already_exists(collection, id).into());
                }
                let mut fields = Fields::new();
                patch.apply(&mut fields, now_ms);
                Ok(Some(fields))
            },
            WriteOp::Set { patch, .. } => {
                let mut fields = Fields::new();
                patch.apply(&mut fields, now_ms);
                Ok(Some(fields))
            },
            WriteOp::Update { collection, id, patch } => {
                let mut fields = current.ok_or_else(|| DirectoryError::not_found(collection, id))?;
                patch.apply(&mut fields, now_ms);
                Ok(Some(fields))
            },
            WriteOp::Delete { .. } => Ok(None),
            WriteOp::Guard {
                collection,
                id,
                field,
                forbidden,
                to,
            } => {
                let fields = current.ok_or_else(|| DirectoryError::not_found(collection, id))?;
                if fields.get(field) == Some(forbidden) {
                    let from = forbidden.as_str().map_or_else(|| forbidden.to_string(), str::to_string);
                    return Err(DirectoryError::invalid_transition(from, to.as_str()).into());
                }
                Ok(Some(fields))
            },
        }
    }
}

/// Collection-scoped access to an external document database.
///
/// Reads never fail for a missing document; they return `None` or an empty
/// list. `update` on a missing document fails with
/// [`DirectoryError::NotFound`] and `create` on an existing one with
/// [`DirectoryError::AlreadyExists`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// Applies the batch atomically: either every operation lands or none.
    async fn commit(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Inserts under a store-assigned id.
    async fn add(&self, collection: &str, patch: Patch) -> Result<String> {
        let id = new_document_id();
        self.create(collection, &id, patch).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, patch: Patch) -> Result<()> {
        self.commit(vec![WriteOp::Create {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        }])
        .await
    }

    async fn set(&self, collection: &str, id: &str, patch: Patch) -> Result<()> {
        self.commit(vec![WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        }])
        .await
    }

    async fn update(&self, collection: &str, id: &str, patch: Patch) -> Result<()> {
        self.commit(vec![WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        }])
        .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.commit(vec![WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }])
        .await
    }

    async fn count(&self, collection: &str, query: &Query) -> Result<usize> {
        Ok(self.query(collection, query).await?.len())
    }
}

pub fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}
