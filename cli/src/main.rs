use anyhow::Result;
use clap::Parser;
use toolshelf_cli::{cli::Cli, commands};
use toolshelf_shared::{logging::init_logging, DirectoryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Logging first so configuration fallbacks are reported.
    let _log_guard = init_logging(DirectoryConfig::log_dir_from_env().as_deref())?;
    let config = DirectoryConfig::from_env();

    let cli = Cli::parse();
    commands::run(cli, config).await
}
