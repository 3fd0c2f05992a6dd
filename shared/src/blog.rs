//! Blog reads over the canonical `blog_posts` collection and the legacy
//! `blogs` collection, plus canonical-only writes.

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::{
    collections::{BLOG_POSTS, LEGACY_BLOGS},
    error::DirectoryError,
    models::{BlogPost, BlogPostPatch, BlogStatus, NewBlogPost},
    store::{Document, Fields, Patch, Query},
    text::{slugify, split_list},
    timestamp, Directory,
};

pub const DEFAULT_FEATURED_BLOG_LIMIT: usize = 3;

/// A raw blog document tagged with the collection it was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum BlogRecord {
    Current(Document),
    /// `excerpt`/`authorName`/boolean `published` layout.
    Legacy(Document),
}

impl BlogRecord {
    pub fn document(&self) -> &Document {
        match self {
            BlogRecord::Current(doc) | BlogRecord::Legacy(doc) => doc,
        }
    }

    /// Maps either layout onto [`BlogPost`]. Pure: the same record always
    /// yields the same post, and normalizing the serialized result again is
    /// a no-op apart from a missing timestamp being filled with "now".
    pub fn normalize(&self) -> BlogPost {
        let doc = self.document();
        let fields = &doc.fields;

        let (summary, author, status) = match self {
            BlogRecord::Current(_) => (
                text(fields, "summary"),
                text(fields, "author"),
                stored_status(fields),
            ),
            BlogRecord::Legacy(_) => {
                let status = if fields.get("published") == Some(&Value::Bool(true)) {
                    BlogStatus::Published
                } else {
                    stored_status(fields)
                };
                (
                    text(fields, "excerpt").or_else(|| text(fields, "summary")),
                    text(fields, "author").or_else(|| text(fields, "authorName")),
                    status,
                )
            },
        };

        let title = text(fields, "title").unwrap_or_default();
        let slug = text(fields, "slug").unwrap_or_else(|| slugify(&title));
        BlogPost {
            id: doc.id.clone(),
            slug,
            content: text(fields, "content").unwrap_or_default(),
            summary: summary.unwrap_or_default(),
            image_url: text(fields, "imageUrl"),
            category: text(fields, "category"),
            tags: tags(fields.get("tags")),
            author: author.unwrap_or_default(),
            status,
            featured: fields.get("featured") == Some(&Value::Bool(true)),
            view_count: fields.get("viewCount").and_then(Value::as_i64).unwrap_or(0),
            created_at: timestamp::from_value_or_now(fields.get("createdAt")),
            updated_at: timestamp::from_value_or_now(fields.get("updatedAt")),
            title,
        }
    }
}

fn text(fields: &Fields, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn stored_status(fields: &Fields) -> BlogStatus {
    fields
        .get("status")
        .and_then(Value::as_str)
        .map(|s| BlogStatus::from(s.to_string()))
        .unwrap_or_default()
}

fn tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => split_list(joined),
        _ => Vec::new(),
    }
}

/// Canonical records first, then legacy records whose id the canonical
/// collection does not hold.
fn overlay(current: Vec<Document>, legacy: Vec<Document>) -> Vec<BlogRecord> {
    let canonical_ids: HashSet<String> = current.iter().map(|d| d.id.clone()).collect();
    current
        .into_iter()
        .map(BlogRecord::Current)
        .chain(
            legacy
                .into_iter()
                .filter(|d| !canonical_ids.contains(&d.id))
                .map(BlogRecord::Legacy),
        )
        .collect()
}

fn newest_first(records: Vec<BlogRecord>) -> Vec<BlogPost> {
    let mut posts: Vec<BlogPost> = records.iter().map(BlogRecord::normalize).collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
    posts
}

impl Directory {
    async fn blog_records(&self, query: &Query) -> Result<Vec<BlogRecord>> {
        let (current, legacy) = futures::try_join!(
            self.store().query(BLOG_POSTS, query),
            self.store().query(LEGACY_BLOGS, query),
        )
        .context("failed to read blog collections")?;
        tracing::debug!(current = current.len(), legacy = legacy.len(), "read blog collections");
        Ok(overlay(current, legacy))
    }

    async fn blog_record(&self, id: &str) -> Result<Option<BlogRecord>> {
        if let Some(doc) = self
            .store()
            .get(BLOG_POSTS, id)
            .await
            .with_context(|| format!("failed to read blog post {id}"))?
        {
            return Ok(Some(BlogRecord::Current(doc)));
        }
        Ok(self
            .store()
            .get(LEGACY_BLOGS, id)
            .await
            .with_context(|| format!("failed to read legacy blog {id}"))?
            .map(BlogRecord::Legacy))
    }

    /// Every post of both collections, newest first. Drafts included.
    pub async fn get_blog_posts(&self) -> Result<Vec<BlogPost>> {
        let result = self.blog_records(&Query::new()).await;
        let records = self.degrade("blog listing", result)?;
        Ok(newest_first(records))
    }

    pub async fn get_featured_blog_posts(&self, limit: usize) -> Result<Vec<BlogPost>> {
        let result = self.blog_records(&Query::new().where_eq("featured", true)).await;
        let records = self.degrade("featured blog posts", result)?;
        Ok(newest_first(records)
            .into_iter()
            .filter(BlogPost::is_published)
            .take(limit)
            .collect())
    }

    pub async fn get_blog_post_by_id(&self, id: &str) -> Result<Option<BlogPost>> {
        Ok(self.blog_record(id).await?.map(|record| record.normalize()))
    }

    /// Published post with `slug`, canonical collection first.
    pub async fn get_blog_post_by_slug(&self, slug: &str) -> Result<Option<BlogPost>> {
        let records = self.blog_records(&Query::new().where_eq("slug", slug)).await?;
        Ok(records
            .iter()
            .map(BlogRecord::normalize)
            .find(BlogPost::is_published))
    }

    pub async fn create_blog_post(&self, post: NewBlogPost) -> Result<String> {
        let mut post = post;
        post.title = post.title.trim().to_string();
        if post.title.is_empty() {
            return Err(DirectoryError::Validation("blog title is required".to_string()).into());
        }
        if post.slug.trim().is_empty() {
            post.slug = slugify(&post.title);
        }
        let patch = Patch::from_serializable(&post)?
            .set("viewCount", 0)
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");
        let id = self
            .store()
            .add(BLOG_POSTS, patch)
            .await
            .with_context(|| format!("failed to create blog post {}", post.title))?;
        tracing::info!(id = %id, slug = %post.slug, "blog post created");
        Ok(id)
    }

    pub async fn update_blog_post(&self, id: &str, patch: BlogPostPatch) -> Result<()> {
        let fields = match serde_json::to_value(&patch).context("failed to encode blog patch")? {
            Value::Object(fields) => fields,
            _ => Fields::new(),
        };
        let patch = Patch::from_fields(fields)
            .without("id")
            .without("createdAt")
            .without("viewCount")
            .server_timestamp("updatedAt");
        self.store()
            .update(BLOG_POSTS, id, patch)
            .await
            .with_context(|| format!("failed to update blog post {id}"))?;
        tracing::info!(id, "blog post updated");
        Ok(())
    }

    pub async fn delete_blog_post(&self, id: &str) -> Result<()> {
        self.store()
            .delete(BLOG_POSTS, id)
            .await
            .with_context(|| format!("failed to delete blog post {id}"))?;
        tracing::info!(id, "blog post deleted");
        Ok(())
    }

    /// +1 on whichever collection holds `id`.
    pub async fn increment_blog_view_count(&self, id: &str) -> Result<()> {
        let collection = match self.blog_record(id).await? {
            Some(BlogRecord::Current(_)) => BLOG_POSTS,
            Some(BlogRecord::Legacy(_)) => LEGACY_BLOGS,
            None => return Err(DirectoryError::not_found(BLOG_POSTS, id).into()),
        };
        self.store()
            .update(collection, id, Patch::new().increment("viewCount", 1))
            .await
            .with_context(|| format!("failed to increment views of {collection}/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        error::is_not_found,
        store::testing::{directory_over, Unavailable},
        ReadFailurePolicy,
    };

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    fn legacy_doc(id: &str) -> Document {
        Document::new(
            id,
            fields(json!({
                "title": "Old Post",
                "slug": "old-post",
                "content": "<p>hi</p>",
                "excerpt": "short",
                "authorName": "Ada",
                "published": true,
                "tags": ["ai", " ", "tools"],
                "createdAt": 1_700_000_000_000_i64,
                "updatedAt": 1_700_000_500_000_i64,
            })),
        )
    }

    #[test]
    fn legacy_fields_are_mapped() {
        let post = BlogRecord::Legacy(legacy_doc("b1")).normalize();
        assert_eq!(post.summary, "short");
        assert_eq!(post.author, "Ada");
        assert_eq!(post.status, BlogStatus::Published);
        assert_eq!(post.tags, vec!["ai", "tools"]);
        assert_eq!(post.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn missing_status_defaults_to_draft() {
        let doc = Document::new("b2", fields(json!({"title": "T", "published": false})));
        assert_eq!(BlogRecord::Legacy(doc.clone()).normalize().status, BlogStatus::Draft);
        assert_eq!(BlogRecord::Current(doc).normalize().status, BlogStatus::Draft);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = BlogRecord::Legacy(legacy_doc("b1")).normalize();
        let reserialized = fields(serde_json::to_value(&once).unwrap());
        let twice = BlogRecord::Legacy(Document::new("b1", reserialized.clone())).normalize();
        assert_eq!(once, twice);
        let as_current = BlogRecord::Current(Document::new("b1", reserialized)).normalize();
        assert_eq!(once, as_current);
    }

    async fn seeded() -> Directory {
        let dir = Directory::in_memory();
        let store = dir.store();
        store
            .set(
                BLOG_POSTS,
                "shared",
                Patch::new()
                    .set("title", "Canonical")
                    .set("slug", "same")
                    .set("status", "PUBLISHED")
                    .set("featured", true)
                    .set("createdAt", 3_000),
            )
            .await
            .unwrap();
        store
            .set(
                LEGACY_BLOGS,
                "shared",
                Patch::new().set("title", "Shadowed").set("createdAt", 9_000),
            )
            .await
            .unwrap();
        store
            .set(
                LEGACY_BLOGS,
                "old",
                Patch::new()
                    .set("title", "Legacy")
                    .set("slug", "legacy")
                    .set("published", true)
                    .set("featured", true)
                    .set("createdAt", 5_000),
            )
            .await
            .unwrap();
        store
            .set(
                BLOG_POSTS,
                "draft",
                Patch::new()
                    .set("title", "Draft")
                    .set("slug", "legacy")
                    .set("createdAt", 1_000),
            )
            .await
            .unwrap();
        dir
    }

    #[tokio::test]
    async fn listing_merges_both_collections_canonical_first() {
        let dir = seeded().await;
        let posts = dir.get_blog_posts().await.unwrap();
        let titles: Vec<_> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Legacy", "Canonical", "Draft"]);

        let featured = dir.get_featured_blog_posts(1).await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, "old");
    }

    #[tokio::test]
    async fn slug_lookup_skips_drafts_and_reaches_legacy() {
        let dir = seeded().await;
        let post = dir.get_blog_post_by_slug("legacy").await.unwrap().unwrap();
        assert_eq!(post.id, "old");
        assert!(dir.get_blog_post_by_slug("missing").await.unwrap().is_none());

        let by_id = dir.get_blog_post_by_id("shared").await.unwrap().unwrap();
        assert_eq!(by_id.title, "Canonical");
    }

    #[tokio::test]
    async fn view_count_targets_the_holding_collection() {
        let dir = seeded().await;
        dir.increment_blog_view_count("old").await.unwrap();
        dir.increment_blog_view_count("old").await.unwrap();
        let legacy = dir.store().get(LEGACY_BLOGS, "old").await.unwrap().unwrap();
        assert_eq!(legacy.get("viewCount"), Some(&json!(2)));

        let err = dir.increment_blog_view_count("nowhere").await.unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn writes_go_to_the_canonical_collection() {
        let dir = Directory::in_memory();
        let id = dir
            .create_blog_post(NewBlogPost {
                title: "Hello World".to_string(),
                content: "## heading".to_string(),
                ..NewBlogPost::default()
            })
            .await
            .unwrap();
        let post = dir.get_blog_post_by_id(&id).await.unwrap().unwrap();
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.status, BlogStatus::Draft);

        dir.update_blog_post(
            &id,
            BlogPostPatch {
                status: Some(BlogStatus::Published),
                ..BlogPostPatch::default()
            },
        )
        .await
        .unwrap();
        assert!(dir.get_blog_post_by_slug("hello-world").await.unwrap().is_some());

        dir.delete_blog_post(&id).await.unwrap();
        assert!(dir.get_blog_post_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listing_failures_follow_the_read_policy() {
        let degraded = directory_over(Unavailable, ReadFailurePolicy::Degrade);
        assert!(degraded.get_blog_posts().await.unwrap().is_empty());
        assert!(degraded.get_featured_blog_posts(3).await.unwrap().is_empty());

        let strict = directory_over(Unavailable, ReadFailurePolicy::Propagate);
        assert!(strict.get_blog_posts().await.is_err());
        assert!(strict.get_featured_blog_posts(3).await.is_err());
        // Lookups by id are not soft reads.
        assert!(degraded.get_blog_post_by_id("p1").await.is_err());
    }
}
