//! Batch import of loosely typed tool rows, as exported from spreadsheets.

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    error::DirectoryError,
    models::{NewTool, ToolPricing, ToolStatus, DEFAULT_TOOL_CATEGORY},
    text::{normalize_opt, split_list},
    Directory,
};

/// One spreadsheet row. Every cell is optional text; list cells are
/// comma-joined and booleans are the strings `true`/`false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportRow {
    #[serde(deserialize_with = "loose_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub slug: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub long_description: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub website_url: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub category: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub subcategory: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub pricing: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub tags: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub features: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub pros: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub cons: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub alternatives: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub affiliate_link: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub sponsored: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub featured: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub rating: Option<String>,
}

/// Accepts text, numbers, booleans and arrays (joined with commas).
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn render(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(render)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::Object(_) => None,
        }
    }
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(render).and_then(|s| normalize_opt(Some(s))))
}

fn flag(cell: &Option<String>) -> bool {
    cell.as_deref()
        .map(str::trim)
        .is_some_and(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v == "1")
}

fn list(cell: &Option<String>) -> Vec<String> {
    cell.as_deref().map(split_list).unwrap_or_default()
}

impl ImportRow {
    pub fn into_new_tool(self) -> Result<NewTool, DirectoryError> {
        let name = self
            .name
            .clone()
            .ok_or_else(|| DirectoryError::Validation("missing name".to_string()))?;

        let mut pricing = Vec::new();
        for tier in list(&self.pricing) {
            let parsed = ToolPricing::parse(&tier)
                .ok_or_else(|| DirectoryError::Validation(format!("unknown pricing tier `{tier}`")))?;
            if !pricing.contains(&parsed) {
                pricing.push(parsed);
            }
        }
        if pricing.is_empty() {
            pricing.push(ToolPricing::Free);
        }

        let rating = match self.rating.as_deref() {
            Some(raw) => Some(
                raw.parse::<f64>()
                    .map_err(|_| DirectoryError::Validation(format!("rating `{raw}` is not a number")))?,
            ),
            None => None,
        };

        Ok(NewTool {
            slug: self.slug.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            long_description: self.long_description.clone(),
            image_url: self.image_url.clone().unwrap_or_default(),
            website_url: self.website_url.clone().unwrap_or_default(),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_TOOL_CATEGORY.to_string()),
            subcategory: self.subcategory.clone(),
            pricing,
            tags: list(&self.tags),
            features: list(&self.features),
            pros: list(&self.pros),
            cons: list(&self.cons),
            alternatives: list(&self.alternatives),
            affiliate_link: self.affiliate_link.clone(),
            sponsored: flag(&self.sponsored),
            status: self
                .status
                .clone()
                .map(ToolStatus::from)
                .unwrap_or_default(),
            featured: flag(&self.featured),
            rating,
            rating_count: None,
            name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// 1-based position in the input.
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success: usize,
    pub failed: usize,
    #[serde(default)]
    pub errors: Vec<RowError>,
    /// Ids of the tools created, in input order.
    #[serde(default)]
    pub created: Vec<String>,
}

impl Directory {
    /// Creates one tool per row. A bad row is recorded and skipped; the
    /// rest of the batch still runs.
    pub async fn import_tools(&self, rows: Vec<ImportRow>) -> Result<ImportReport> {
        let total = rows.len();
        let mut report = ImportReport::default();
        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            let name = row.name.clone();
            let outcome = match row.into_new_tool() {
                Ok(tool) => self.create_tool(tool).await,
                Err(err) => Err(err.into()),
            };
            match outcome {
                Ok(id) => {
                    report.success += 1;
                    report.created.push(id);
                },
                Err(err) => {
                    tracing::warn!(row = row_number, "import row failed: {err:#}");
                    report.failed += 1;
                    report.errors.push(RowError {
                        row: row_number,
                        name,
                        message: format!("{err:#}"),
                    });
                },
            }
        }
        tracing::info!(total, success = report.success, failed = report.failed, "tool import finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn rows(value: Value) -> Vec<ImportRow> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn loose_cells_are_normalized() {
        let row = &rows(json!([{
            "name": "Writer",
            "pricing": "Freemium, contact",
            "tags": ["a", "b"],
            "featured": "TRUE",
            "sponsored": false,
            "rating": 4.5,
            "status": "beta",
            "category": "  ",
            "unknownColumn": {"x": 1}
        }]))[0];
        let tool = row.clone().into_new_tool().unwrap();
        assert_eq!(tool.pricing, vec![ToolPricing::Freemium, ToolPricing::Enterprise]);
        assert_eq!(tool.tags, vec!["a", "b"]);
        assert!(tool.featured);
        assert!(!tool.sponsored);
        assert_eq!(tool.rating, Some(4.5));
        assert_eq!(tool.status, ToolStatus::Beta);
        assert_eq!(tool.category, "text");
    }

    #[tokio::test]
    async fn bad_rows_are_counted_and_skipped() {
        let dir = Directory::in_memory();
        let report = dir
            .import_tools(rows(json!([
                {"name": "Alpha", "tags": "x, y"},
                {"description": "no name"},
                {"name": "Gamma", "pricing": "lifetime"},
                {"name": "Delta Tool", "pricing": "paid"}
            ])))
            .await
            .unwrap();
        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(
            report.errors.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(report.errors[1].message.contains("lifetime"));

        let delta = dir.get_tool_by_slug("delta-tool").await.unwrap().unwrap();
        assert_eq!(delta.pricing, vec![ToolPricing::Paid]);
        assert!(delta.is_active());
        let alpha = dir.get_tool_by_id(&report.created[0]).await.unwrap().unwrap();
        assert_eq!(alpha.pricing, vec![ToolPricing::Free]);
        assert_eq!(alpha.tags, vec!["x", "y"]);
    }
}
