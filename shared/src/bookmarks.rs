//! Per-user tool bookmarks. One document per (user, tool) pair.

use anyhow::{Context, Result};

use crate::{
    collections::BOOKMARKS,
    error::{is_already_exists, DirectoryError},
    models::{Bookmark, NewBookmark},
    store::{OrderBy, Patch, Query},
    Directory,
};

/// Deterministic document id for a (user, tool) pair. The user id length
/// prefix keeps `("a-b", "c")` and `("a", "b-c")` apart.
pub fn bookmark_id(user_id: &str, tool_id: &str) -> String {
    format!("bm-{}-{user_id}-{tool_id}", user_id.len())
}

fn pair_query(user_id: &str, tool_id: &str) -> Query {
    Query::new()
        .where_eq("userId", user_id)
        .where_eq("toolId", tool_id)
        .limit(1)
}

impl Directory {
    /// Returns the bookmark id. Adding an existing pair is not an error and
    /// yields the id already stored.
    pub async fn add_bookmark(&self, bookmark: NewBookmark) -> Result<String> {
        if bookmark.user_id.trim().is_empty() || bookmark.tool_id.trim().is_empty() {
            return Err(
                DirectoryError::Validation("bookmark needs a user and a tool".to_string()).into(),
            );
        }
        let id = bookmark_id(&bookmark.user_id, &bookmark.tool_id);
        let patch = Patch::from_serializable(&bookmark)?.server_timestamp("createdAt");
        match self.store().create(BOOKMARKS, &id, patch).await {
            Ok(()) => {
                tracing::info!(id = %id, "bookmark added");
                Ok(id)
            },
            Err(err) if is_already_exists(&err) => {
                tracing::debug!(id = %id, "bookmark already present");
                Ok(id)
            },
            Err(err) => Err(err.context(format!("failed to add bookmark {id}"))),
        }
    }

    /// Newest first.
    pub async fn get_user_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>> {
        let query = Query::new()
            .where_eq("userId", user_id)
            .order_by(OrderBy::desc("createdAt"));
        let docs = self
            .store()
            .query(BOOKMARKS, &query)
            .await
            .with_context(|| format!("failed to list bookmarks of {user_id}"))?;
        Ok(self.decode_all(BOOKMARKS, &docs))
    }

    pub async fn get_bookmark(&self, user_id: &str, tool_id: &str) -> Result<Option<Bookmark>> {
        let docs = self
            .store()
            .query(BOOKMARKS, &pair_query(user_id, tool_id))
            .await
            .context("failed to look up bookmark")?;
        docs.first().map(|doc| doc.decode()).transpose()
    }

    pub async fn is_tool_bookmarked(&self, user_id: &str, tool_id: &str) -> Result<bool> {
        let result = self
            .store()
            .count(BOOKMARKS, &pair_query(user_id, tool_id))
            .await
            .map(|n| n > 0);
        self.degrade("bookmark check", result)
    }

    /// Idempotent.
    pub async fn remove_bookmark(&self, id: &str) -> Result<()> {
        self.store()
            .delete(BOOKMARKS, id)
            .await
            .with_context(|| format!("failed to remove bookmark {id}"))?;
        tracing::info!(id, "bookmark removed");
        Ok(())
    }

    pub async fn update_bookmark_notes(&self, id: &str, notes: &str) -> Result<()> {
        let patch = Patch::new()
            .set("notes", notes)
            .server_timestamp("updatedAt");
        self.store()
            .update(BOOKMARKS, id, patch)
            .await
            .with_context(|| format!("failed to update notes of bookmark {id}"))
    }
}
