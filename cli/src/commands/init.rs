use anyhow::Result;
use toolshelf_shared::{collections, store::Query, Directory, DirectoryConfig};

pub async fn run(config: DirectoryConfig) -> Result<()> {
    let db_path = config.db_path.clone();
    let dir = Directory::open(config).await?;

    for collection in collections::ALL {
        let count = dir.store().count(collection, &Query::new()).await?;
        tracing::info!("{collection}: {count} documents");
    }
    tracing::info!("Document store initialized at {}", db_path.display());
    Ok(())
}
