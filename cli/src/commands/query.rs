use anyhow::Result;
use serde_json::Value;
use toolshelf_shared::{collections, store::Query, Directory};

use crate::{
    cli::QueryOutputFormat,
    utils::{format_table, format_vertical},
};

const MAX_TABLE_COLUMNS: usize = 8;

pub async fn run(
    dir: &Directory,
    collection: &str,
    limit: usize,
    format: QueryOutputFormat,
) -> Result<()> {
    if !collections::ALL.contains(&collection) {
        tracing::warn!("`{collection}` is not a known collection; known: {}", collections::ALL.join(", "));
    }
    let docs = dir
        .store()
        .query(collection, &Query::new().limit(limit))
        .await?;

    let rows: Vec<_> = docs
        .into_iter()
        .map(|doc| {
            let mut row = serde_json::Map::new();
            row.insert("id".to_string(), Value::String(doc.id));
            row.extend(doc.fields);
            row
        })
        .collect();

    let output = match format {
        QueryOutputFormat::Table => {
            let mut columns: Vec<&str> = vec!["id"];
            for row in &rows {
                for key in row.keys() {
                    if columns.len() < MAX_TABLE_COLUMNS && !columns.contains(&key.as_str()) {
                        columns.push(key.as_str());
                    }
                }
            }
            format_table(&columns, &rows)
        },
        QueryOutputFormat::Vertical => format_vertical(&rows),
    };
    tracing::info!("\n{output}");
    Ok(())
}
