use anyhow::Result;
use toolshelf_shared::{
    store::Direction,
    tools::{ToolFilters, ToolSortField},
    Directory,
};

use crate::{
    cli::{SortOrder, ToolsCommand},
    utils::{format_table, format_vertical, to_row},
};

const LIST_COLUMNS: &[&str] = &["id", "name", "category", "status", "pricing", "viewCount"];

pub async fn run(dir: &Directory, command: ToolsCommand) -> Result<()> {
    match command {
        ToolsCommand::List {
            category,
            status,
            search,
            sort_by,
            order,
            page,
            page_size,
            after,
        } => {
            let filters = ToolFilters {
                category,
                status,
                search_term: search,
                sort_by: sort_by.parse::<ToolSortField>().map_err(anyhow::Error::msg)?,
                sort_order: match order {
                    SortOrder::Asc => Direction::Asc,
                    SortOrder::Desc => Direction::Desc,
                },
            };
            let result = match after {
                Some(token) => dir.list_tools_after(Some(&token), page_size, &filters).await?,
                None => dir.list_tools(page, page_size, &filters).await?,
            };
            let rows = result.items.iter().map(to_row).collect::<Result<Vec<_>>>()?;
            tracing::info!("\n{}", format_table(LIST_COLUMNS, &rows));
            let total = dir.count_tools(&filters).await?;
            match result.page {
                Some(page) => tracing::info!("page {page}, {} shown, {total} matching", rows.len()),
                None => tracing::info!("{} shown, {total} matching", rows.len()),
            }
            if let Some(next) = result.next_cursor {
                tracing::info!("next page: --after {next}");
            }
            Ok(())
        },
        ToolsCommand::Get { key } => {
            let tool = match dir.get_tool_by_id(&key).await? {
                Some(tool) => Some(tool),
                None => dir.get_tool_by_slug(&key).await?,
            };
            let Some(tool) = tool else {
                anyhow::bail!("no tool with id or slug `{key}`");
            };
            tracing::info!("\n{}", format_vertical(&[to_row(&tool)?]));
            Ok(())
        },
        ToolsCommand::Search { query } => {
            let tools = dir.search_tools(&query).await?;
            let rows = tools.iter().map(to_row).collect::<Result<Vec<_>>>()?;
            tracing::info!("\n{}", format_table(LIST_COLUMNS, &rows));
            tracing::info!("{} tools match `{query}`", rows.len());
            Ok(())
        },
    }
}
