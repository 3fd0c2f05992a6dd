//! Category listing: stored category documents when present, otherwise
//! synthesized from the primary category of every tool.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::{
    collections::{CATEGORIES, TOOLS},
    models::{Category, Tool},
    store::Query,
    text::{category_slug, primary_category},
    Directory,
};

fn by_count_then_name(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        b.tool_count
            .cmp(&a.tool_count)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// One category per distinct primary segment, counting the tools in it.
pub fn synthesize_categories(tools: &[Tool]) -> Vec<Category> {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for tool in tools {
        let name = tool.primary_category();
        if !name.is_empty() {
            *counts.entry(name).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(name, tool_count)| {
            let slug = category_slug(name);
            Category {
                id: slug.clone(),
                name: name.to_string(),
                slug,
                description: format!("{name} AI tools"),
                icon: None,
                featured_image: None,
                tool_count,
            }
        })
        .collect()
}

impl Directory {
    async fn load_categories(&self) -> Result<Vec<Category>> {
        let docs = self
            .store()
            .query(CATEGORIES, &Query::new())
            .await
            .context("failed to read categories")?;
        if !docs.is_empty() {
            let mut stored: Vec<Category> = self.decode_all(CATEGORIES, &docs);
            for category in &mut stored {
                category.name = primary_category(&category.name).to_string();
            }
            return Ok(stored);
        }

        let tool_docs = self
            .store()
            .query(TOOLS, &Query::new())
            .await
            .context("failed to read tools for category synthesis")?;
        let tools: Vec<Tool> = self.decode_all(TOOLS, &tool_docs);
        tracing::debug!(tools = tools.len(), "no stored categories, synthesizing");
        Ok(synthesize_categories(&tools))
    }

    /// Categories ordered by tool count (descending), then name.
    pub async fn get_all_categories(&self) -> Result<Vec<Category>> {
        let result = self.load_categories().await;
        let mut categories = self.degrade("category listing", result)?;
        by_count_then_name(&mut categories);
        Ok(categories)
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self
            .get_all_categories()
            .await?
            .into_iter()
            .find(|category| category.slug == slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::NewTool,
        store::{
            testing::{directory_over, Unavailable},
            Patch,
        },
        ReadFailurePolicy,
    };

    fn failing(policy: ReadFailurePolicy) -> Directory {
        directory_over(Unavailable, policy)
    }

    #[tokio::test]
    async fn synthesized_from_primary_segments() {
        let dir = Directory::in_memory();
        for (name, category) in [
            ("A", "Image Generation, video"),
            ("B", "Image Generation"),
            ("C", "text"),
            ("D", ""),
        ] {
            dir.create_tool(NewTool {
                name: name.to_string(),
                category: category.to_string(),
                ..NewTool::default()
            })
            .await
            .unwrap();
        }

        let categories = dir.get_all_categories().await.unwrap();
        let summary: Vec<_> = categories
            .iter()
            .map(|c| (c.name.as_str(), c.slug.as_str(), c.tool_count))
            .collect();
        assert_eq!(
            summary,
            vec![("Image Generation", "image-generation", 2), ("text", "text", 1)]
        );
        assert_eq!(categories[0].description, "Image Generation AI tools");

        let found = dir.get_category_by_slug("text").await.unwrap().unwrap();
        assert_eq!(found.tool_count, 1);
        assert!(dir.get_category_by_slug("video").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_categories_win_and_are_cleaned() {
        let dir = Directory::in_memory();
        dir.create_tool(NewTool {
            name: "ignored".to_string(),
            category: "other".to_string(),
            ..NewTool::default()
        })
        .await
        .unwrap();
        dir.store()
            .set(
                CATEGORIES,
                "c1",
                Patch::new()
                    .set("name", "Audio, Music")
                    .set("slug", "audio")
                    .set("toolCount", "4"),
            )
            .await
            .unwrap();

        let categories = dir.get_all_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Audio");
        assert_eq!(categories[0].tool_count, 4);
    }

    #[tokio::test]
    async fn failures_follow_the_read_policy() {
        let degraded = failing(ReadFailurePolicy::Degrade);
        assert!(degraded.get_all_categories().await.unwrap().is_empty());

        let strict = failing(ReadFailurePolicy::Propagate);
        let err = strict.get_all_categories().await.unwrap_err();
        assert!(format!("{err:#}").contains("backend unavailable"));
    }
}
