use anyhow::Result;
use toolshelf_shared::Directory;

use crate::utils::{format_table, to_row};

pub async fn run(dir: &Directory) -> Result<()> {
    let categories = dir.get_all_categories().await?;
    let rows = categories.iter().map(to_row).collect::<Result<Vec<_>>>()?;
    let table = format_table(&["name", "slug", "toolCount", "description"], &rows);
    tracing::info!("\n{table}");
    Ok(())
}
