pub mod blog;
pub mod categories;
pub mod import_tools;
pub mod init;
pub mod query;
pub mod submissions;
pub mod tools;

use anyhow::Result;
use toolshelf_shared::{Directory, DirectoryConfig};

use crate::cli::{Cli, Commands};

pub async fn run(cli: Cli, mut config: DirectoryConfig) -> Result<()> {
    if let Some(db_path) = cli.db_path {
        config.db_path = db_path;
    }
    if let Commands::Init = cli.command {
        return init::run(config).await;
    }

    let dir = Directory::open(config).await?;
    match cli.command {
        Commands::Init => Ok(()),
        Commands::ImportTools { file } => import_tools::run(&dir, &file).await,
        Commands::Tools { command } => tools::run(&dir, command).await,
        Commands::Submissions { command } => submissions::run(&dir, command).await,
        Commands::Blog { command } => blog::run(&dir, command).await,
        Commands::Categories => categories::run(&dir).await,
        Commands::Query {
            collection,
            limit,
            format,
        } => query::run(&dir, &collection, limit, format).await,
    }
}
