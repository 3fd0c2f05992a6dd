use std::path::Path;

use anyhow::Result;
use toolshelf_shared::Directory;

use crate::utils::read_rows_file;

pub async fn run(dir: &Directory, file: &Path) -> Result<()> {
    let rows = read_rows_file(file)?;
    if rows.is_empty() {
        anyhow::bail!("no rows found in {}", file.display());
    }
    tracing::info!("Importing {} rows from {}", rows.len(), file.display());

    let report = dir.import_tools(rows).await?;
    for error in &report.errors {
        tracing::warn!(
            "row {} ({}): {}",
            error.row,
            error.name.as_deref().unwrap_or("unnamed"),
            error.message
        );
    }
    tracing::info!("Import finished: {} succeeded, {} failed", report.success, report.failed);
    Ok(())
}
