//! Tool catalog reads, writes and the filtered list query.

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    collections::TOOLS,
    error::DirectoryError,
    models::{NewTool, Tool, ToolPatch, ToolPricing, TOOL_STATUS_ACTIVE},
    pagination::{decode_cursor, encode_cursor, fetch_page, Page},
    store::{Direction, Document, Fields, OrderBy, Patch, Query},
    text::slugify,
    Directory,
};

/// Filter value meaning "no constraint" for category and status.
pub const ALL_FILTER: &str = "all";
const CATEGORY_PAGE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    ViewCount,
    Rating,
}

impl ToolSortField {
    pub fn field(self) -> &'static str {
        match self {
            ToolSortField::CreatedAt => "createdAt",
            ToolSortField::UpdatedAt => "updatedAt",
            ToolSortField::Name => "name",
            ToolSortField::ViewCount => "viewCount",
            ToolSortField::Rating => "rating",
        }
    }
}

impl FromStr for ToolSortField {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "createdat" | "created" | "newest" => Ok(Self::CreatedAt),
            "updatedat" | "updated" => Ok(Self::UpdatedAt),
            "name" => Ok(Self::Name),
            "viewcount" | "views" | "popular" => Ok(Self::ViewCount),
            "rating" => Ok(Self::Rating),
            other => Err(format!("unknown sort field `{other}`")),
        }
    }
}

/// Inputs of the filtered list query. `None`, empty and `"all"` leave
/// category/status unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFilters {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub sort_by: ToolSortField,
    #[serde(default)]
    pub sort_order: Direction,
}

impl ToolFilters {
    fn constraint(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL_FILTER))
    }

    fn search_term(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    /// Equality predicates plus the single sort clause, no cursor or limit.
    pub fn base_query(&self) -> Query {
        let mut query = Query::new();
        if let Some(category) = Self::constraint(&self.category) {
            query = query.where_eq("category", category);
        }
        if let Some(status) = Self::constraint(&self.status) {
            query = query.where_eq("status", status);
        }
        query.order_by(OrderBy {
            field: self.sort_by.field().to_string(),
            direction: self.sort_order,
        })
    }
}

impl Directory {
    pub async fn get_all_tools(&self) -> Result<Vec<Tool>> {
        let docs = self
            .store()
            .query(TOOLS, &Query::new().order_by(OrderBy::desc("createdAt")))
            .await
            .context("failed to list tools")?;
        Ok(self.decode_all(TOOLS, &docs))
    }

    pub async fn get_featured_tools(&self) -> Result<Vec<Tool>> {
        let query = Query::new()
            .where_eq("featured", true)
            .where_eq("status", TOOL_STATUS_ACTIVE);
        let result = self.store().query(TOOLS, &query).await;
        let docs = self.degrade("featured tools", result)?;
        if docs.is_empty() {
            tracing::debug!("no featured active tools");
        }
        Ok(self.decode_all(TOOLS, &docs))
    }

    /// Active tools whose stored category equals `category`, at most 20.
    pub async fn get_tools_by_category(&self, category: &str) -> Result<Vec<Tool>> {
        let query = Query::new()
            .where_eq("category", category)
            .where_eq("status", TOOL_STATUS_ACTIVE)
            .limit(CATEGORY_PAGE_LIMIT);
        let docs = self
            .store()
            .query(TOOLS, &query)
            .await
            .with_context(|| format!("failed to list tools in category {category}"))?;
        Ok(self.decode_all(TOOLS, &docs))
    }

    pub async fn get_tool_by_id(&self, id: &str) -> Result<Option<Tool>> {
        let doc = self
            .store()
            .get(TOOLS, id)
            .await
            .with_context(|| format!("failed to read tool {id}"))?;
        doc.map(|doc| doc.decode()).transpose()
    }

    pub async fn get_tool_by_slug(&self, slug: &str) -> Result<Option<Tool>> {
        let docs = self
            .store()
            .query(TOOLS, &Query::new().where_eq("slug", slug).limit(1))
            .await
            .with_context(|| format!("failed to look up tool slug {slug}"))?;
        docs.first().map(|doc| doc.decode()).transpose()
    }

    pub async fn count_tools(&self, filters: &ToolFilters) -> Result<usize> {
        let mut query = filters.base_query();
        query.order_by.clear();
        self.store()
            .count(TOOLS, &query)
            .await
            .context("failed to count tools")
    }

    /// Stores a new tool with server timestamps and a zero view count.
    /// Returns the store-assigned id.
    pub async fn create_tool(&self, tool: NewTool) -> Result<String> {
        let mut tool = tool;
        tool.name = tool.name.trim().to_string();
        if tool.name.is_empty() {
            return Err(DirectoryError::Validation("tool name is required".to_string()).into());
        }
        if tool.slug.trim().is_empty() {
            tool.slug = slugify(&tool.name);
        }
        if tool.pricing.is_empty() {
            tool.pricing.push(ToolPricing::Free);
        }

        let patch = Patch::from_serializable(&tool)?
            .set("viewCount", 0)
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");
        let id = self
            .store()
            .add(TOOLS, patch)
            .await
            .with_context(|| format!("failed to create tool {}", tool.name))?;
        self.reindex_tool(&id).await?;
        tracing::info!(id = %id, name = %tool.name, "tool created");
        Ok(id)
    }

    pub async fn update_tool(&self, id: &str, patch: ToolPatch) -> Result<()> {
        let fields = match serde_json::to_value(&patch).context("failed to encode tool patch")? {
            serde_json::Value::Object(fields) => fields,
            _ => Fields::new(),
        };
        self.update_tool_fields(id, fields).await
    }

    /// Merges raw fields into a tool. Caller-supplied `id`, `createdAt` and
    /// `viewCount` are discarded and `updatedAt` is re-stamped; views only
    /// move through [`Directory::increment_tool_view_count`].
    pub async fn update_tool_fields(&self, id: &str, fields: Fields) -> Result<()> {
        let patch = Patch::from_fields(fields)
            .without("id")
            .without("createdAt")
            .without("viewCount")
            .server_timestamp("updatedAt");
        self.store()
            .update(TOOLS, id, patch)
            .await
            .with_context(|| format!("failed to update tool {id}"))?;
        self.reindex_tool(id).await?;
        tracing::info!(id, "tool updated");
        Ok(())
    }

    pub async fn delete_tool(&self, id: &str) -> Result<()> {
        self.store()
            .delete(TOOLS, id)
            .await
            .with_context(|| format!("failed to delete tool {id}"))?;
        self.search_index().remove(id).await;
        tracing::info!(id, "tool deleted");
        Ok(())
    }

    /// Atomic +1 on `viewCount`. Fails with not-found for a missing tool.
    pub async fn increment_tool_view_count(&self, id: &str) -> Result<()> {
        self.store()
            .update(TOOLS, id, Patch::new().increment("viewCount", 1))
            .await
            .with_context(|| format!("failed to increment views of tool {id}"))
    }

    /// Filtered list query by page number.
    ///
    /// Without a search term this is one indexed read positioned by the
    /// re-derived page anchor. With a search term the full match set is
    /// filtered, sorted and sliced in memory.
    pub async fn list_tools(
        &self,
        page: usize,
        page_size: usize,
        filters: &ToolFilters,
    ) -> Result<Page<Tool>> {
        let page = page.max(1);
        let page_size = self.effective_page_size(page_size);
        let base = filters.base_query();

        let docs = match filters.search_term() {
            None => fetch_page(self.store().as_ref(), TOOLS, &base, page, page_size)
                .await
                .context("failed to list tools")?,
            Some(term) => {
                let matches = self.search_matches(term, &base).await?;
                matches
                    .into_iter()
                    .skip((page - 1).saturating_mul(page_size))
                    .take(page_size)
                    .collect()
            },
        };
        self.tool_page(docs, Some(page), page_size, &base)
    }

    /// Filtered list query addressed by an opaque page token instead of a
    /// page number. `None` starts at the first page.
    pub async fn list_tools_after(
        &self,
        cursor: Option<&str>,
        page_size: usize,
        filters: &ToolFilters,
    ) -> Result<Page<Tool>> {
        let page_size = self.effective_page_size(page_size);
        let base = filters.base_query();
        let mut query = base.clone();
        if let Some(token) = cursor {
            query = query.start_after(decode_cursor(token, &base)?);
        }
        let query = query.limit(page_size);

        let docs = match filters.search_term() {
            None => self
                .store()
                .query(TOOLS, &query)
                .await
                .context("failed to list tools")?,
            Some(term) => {
                let hits = self.search_hits(term).await?;
                query.run(hits)
            },
        };
        self.tool_page(docs, None, page_size, &base)
    }

    async fn search_hits(&self, term: &str) -> Result<Vec<Document>> {
        let result = self.search_tool_documents(term).await;
        self.degrade("tool search", result)
    }

    /// Search hits narrowed by the base filters, in base order.
    async fn search_matches(&self, term: &str, base: &Query) -> Result<Vec<Document>> {
        let hits = self.search_hits(term).await?;
        Ok(base.run(hits))
    }

    fn tool_page(
        &self,
        docs: Vec<Document>,
        page: Option<usize>,
        page_size: usize,
        base: &Query,
    ) -> Result<Page<Tool>> {
        let next_cursor = match docs.last() {
            Some(last) if docs.len() == page_size => Some(encode_cursor(base, last)?),
            _ => None,
        };
        Ok(Page {
            items: self.decode_all(TOOLS, &docs),
            page,
            page_size,
            next_cursor,
        })
    }

    fn effective_page_size(&self, requested: usize) -> usize {
        if requested == 0 {
            self.config().default_page_size
        } else {
            requested.min(crate::config::MAX_PAGE_SIZE)
        }
    }

    async fn reindex_tool(&self, id: &str) -> Result<()> {
        if !self.search_index().is_built().await {
            return Ok(());
        }
        match self.store().get(TOOLS, id).await? {
            Some(doc) => self.search_index().upsert(&doc).await,
            None => self.search_index().remove(id).await,
        }
        Ok(())
    }
}
