use anyhow::Result;
use toolshelf_shared::Directory;

use crate::{
    cli::BlogCommand,
    utils::{format_table, format_vertical, to_row},
};

pub async fn run(dir: &Directory, command: BlogCommand) -> Result<()> {
    match command {
        BlogCommand::List => {
            let posts = dir.get_blog_posts().await?;
            let rows = posts.iter().map(to_row).collect::<Result<Vec<_>>>()?;
            let table = format_table(&["id", "title", "slug", "status", "author", "createdAt"], &rows);
            tracing::info!("\n{table}");
        },
        BlogCommand::Get { key } => {
            let post = match dir.get_blog_post_by_id(&key).await? {
                Some(post) => Some(post),
                None => dir.get_blog_post_by_slug(&key).await?,
            };
            let Some(post) = post else {
                anyhow::bail!("no blog post with id `{key}` or published slug `{key}`");
            };
            let mut row = to_row(&post)?;
            row.insert(
                "format".to_string(),
                serde_json::Value::String(format!("{:?}", post.content_format()).to_lowercase()),
            );
            tracing::info!("\n{}", format_vertical(&[row]));
        },
    }
    Ok(())
}
