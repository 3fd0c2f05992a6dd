//! Page-number and token pagination over ordered store queries.
//!
//! Page numbers are resolved by re-running the base query bounded to the
//! rows before the requested page and anchoring on its last row. Page tokens
//! skip that re-query by carrying the last row's sort values directly.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::DirectoryError,
    store::{Document, DocumentStore, Query, StartAfter},
};

const CURSOR_VERSION: u8 = 1;
const MAX_CURSOR_TOKEN_LEN: usize = 4096;

/// Exclusive bound for a requested page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageAnchor {
    FirstPage,
    After(Document),
    /// Fewer rows exist than the pages before the requested one.
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number; absent for token-addressed pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub page_size: usize,
    /// Token for the page after this one. `None` once a short page is seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn empty(page: Option<usize>, page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page,
            page_size,
            next_cursor: None,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            next_cursor: self.next_cursor,
        }
    }
}

/// Finds the anchor for 1-based `page` by re-running `base` (which must not
/// carry its own cursor or limit) with limit `(page - 1) * page_size`.
/// Store errors propagate unchanged.
pub async fn resolve_page_anchor(
    store: &dyn DocumentStore,
    collection: &str,
    base: &Query,
    page: usize,
    page_size: usize,
) -> Result<PageAnchor> {
    if page <= 1 {
        return Ok(PageAnchor::FirstPage);
    }
    let skip = (page - 1).saturating_mul(page_size.max(1));
    let mut bounded = base.clone();
    bounded.start_after = None;
    bounded.limit = Some(skip);

    let mut preceding = store.query(collection, &bounded).await?;
    if preceding.len() < skip {
        tracing::debug!(collection, page, page_size, found = preceding.len(), "page out of range");
        return Ok(PageAnchor::OutOfRange);
    }
    Ok(preceding
        .pop()
        .map(PageAnchor::After)
        .unwrap_or(PageAnchor::OutOfRange))
}

/// Reads one page of `base`. A page past the end is empty, not an error.
pub async fn fetch_page(
    store: &dyn DocumentStore,
    collection: &str,
    base: &Query,
    page: usize,
    page_size: usize,
) -> Result<Vec<Document>> {
    let page_size = page_size.max(1);
    let mut query = base.clone();
    query.start_after = None;
    match resolve_page_anchor(store, collection, base, page, page_size).await? {
        PageAnchor::FirstPage => {},
        PageAnchor::After(anchor) => query = query.start_after_document(&anchor),
        PageAnchor::OutOfRange => return Ok(Vec::new()),
    }
    store.query(collection, &query.limit(page_size)).await
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    v: u8,
    scope: String,
    values: Vec<Value>,
    id: String,
}

/// Encodes the position after `last` as an opaque token bound to the
/// filters and ordering of `query`.
pub fn encode_cursor(query: &Query, last: &Document) -> Result<String> {
    let positioned = query.clone().start_after_document(last);
    let position = positioned
        .start_after
        .context("cursor position missing after positioning")?;
    let payload = CursorPayload {
        v: CURSOR_VERSION,
        scope: query_scope(query),
        values: position.values,
        id: position.id,
    };
    let bytes = serde_json::to_vec(&payload).context("failed to encode page cursor")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decodes a token minted by [`encode_cursor`] for the same query shape.
pub fn decode_cursor(token: &str, query: &Query) -> Result<StartAfter> {
    let invalid =
        |reason: &str| anyhow::Error::from(DirectoryError::InvalidCursor(reason.to_string()));

    if token.is_empty() || token.len() > MAX_CURSOR_TOKEN_LEN {
        return Err(invalid("token length out of bounds"));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| invalid("token is not base64"))?;
    let payload: CursorPayload =
        serde_json::from_slice(&bytes).map_err(|_| invalid("token payload is malformed"))?;
    if payload.v != CURSOR_VERSION {
        return Err(invalid("unsupported token version"));
    }
    if payload.scope != query_scope(query) {
        return Err(invalid("token was issued for a different filter or ordering"));
    }
    if payload.values.len() != query.order_by.len() {
        return Err(invalid("token sort values do not match ordering"));
    }
    Ok(StartAfter {
        values: payload.values,
        id: payload.id,
    })
}

fn query_scope(query: &Query) -> String {
    let filters = query
        .filters
        .iter()
        .map(|f| format!("{}:{:?}:{}", f.field, f.op, f.value))
        .collect::<Vec<_>>()
        .join(";");
    format!("{}|{}", filters, query.order_fingerprint())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::{MemoryStore, OrderBy, Patch};

    async fn seeded(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            // Duplicate timestamps force the id tiebreak to matter.
            store
                .set(
                    "tools",
                    &format!("t{i:03}"),
                    Patch::new()
                        .set("createdAt", (i / 3) as i64)
                        .set("status", if i % 4 == 0 { "beta" } else { "active" }),
                )
                .await
                .unwrap();
        }
        store
    }

    fn base() -> Query {
        Query::new().order_by(OrderBy::desc("createdAt"))
    }

    #[tokio::test]
    async fn pages_cover_every_row_exactly_once() {
        let n = 23;
        let store = seeded(n).await;
        for page_size in [1, 2, 5, 7, 23, 40] {
            let mut seen = Vec::new();
            let pages = n.div_ceil(page_size);
            for page in 1..=pages {
                let rows = fetch_page(&store, "tools", &base(), page, page_size)
                    .await
                    .unwrap();
                seen.extend(rows.into_iter().map(|d| d.id));
            }
            let unique: HashSet<_> = seen.iter().cloned().collect();
            assert_eq!(seen.len(), n, "page size {page_size}");
            assert_eq!(unique.len(), n, "page size {page_size}");
        }
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let store = seeded(5).await;
        let anchor = resolve_page_anchor(&store, "tools", &base(), 4, 2)
            .await
            .unwrap();
        assert_eq!(anchor, PageAnchor::OutOfRange);
        let rows = fetch_page(&store, "tools", &base(), 4, 2).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn tokens_resume_where_the_last_page_ended() {
        let store = seeded(10).await;
        let query = base().where_eq("status", "active");
        let first = store.query("tools", &query.clone().limit(3)).await.unwrap();
        let token = encode_cursor(&query, first.last().unwrap()).unwrap();

        let position = decode_cursor(&token, &query).unwrap();
        let second = store
            .query("tools", &query.clone().start_after(position).limit(3))
            .await
            .unwrap();
        let by_page = fetch_page(&store, "tools", &query, 2, 3).await.unwrap();
        assert_eq!(second, by_page);
    }

    #[test]
    fn tokens_are_bound_to_their_query_shape() {
        let doc = Document::new("t1", serde_json::Map::new());
        let token = encode_cursor(&base(), &doc).unwrap();
        let other = Query::new().order_by(OrderBy::asc("name"));
        let err = decode_cursor(&token, &other).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DirectoryError>(),
            Some(DirectoryError::InvalidCursor(_))
        ));
        assert!(decode_cursor("not base64 !!", &base()).is_err());
    }
}
