#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::TempDir;
    use toolshelf_cli::{cli::Cli, commands};
    use toolshelf_shared::{tools::ToolFilters, Directory, DirectoryConfig};

    fn config(root: &TempDir) -> DirectoryConfig {
        DirectoryConfig {
            db_path: root.path().join("toolshelf.db"),
            media_dir: root.path().join("media"),
            ..DirectoryConfig::default()
        }
    }

    async fn run(root: &TempDir, args: &[&str]) -> anyhow::Result<()> {
        let mut argv = vec!["ts-cli"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("parse arguments");
        commands::run(cli, config(root)).await
    }

    #[tokio::test]
    async fn import_then_moderate_through_the_cli() {
        let root = TempDir::new().expect("create temp dir");
        let rows = root.path().join("rows.json");
        fs::write(
            &rows,
            r#"[{"name": "Alpha Writer", "category": "text"}, {"description": "nameless"}]"#,
        )
        .expect("write rows");

        run(&root, &["init"]).await.expect("init");
        run(&root, &["import-tools", "--file", rows.to_str().expect("utf-8 path")])
            .await
            .expect("import");
        run(&root, &["tools", "list", "--sort-by", "name", "--order", "asc"])
            .await
            .expect("list");
        run(&root, &["tools", "get", "alpha-writer"]).await.expect("get by slug");
        assert!(run(&root, &["tools", "get", "missing"]).await.is_err());
        run(&root, &["query", "tools", "--format", "vertical"])
            .await
            .expect("query");

        let dir = Directory::open(config(&root)).await.expect("open directory");
        assert_eq!(dir.count_tools(&ToolFilters::default()).await.expect("count"), 1);
        let tool = dir
            .get_tool_by_slug("alpha-writer")
            .await
            .expect("lookup")
            .expect("imported tool");
        assert_eq!(tool.category, "text");

        let id = dir
            .submit_tool(
                toolshelf_shared::models::NewTool {
                    name: "Queued".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .expect("submit");
        drop(dir);

        run(&root, &["submissions", "approve", &id, "--admin", "ops"])
            .await
            .expect("approve");
        assert!(run(&root, &["submissions", "approve", &id]).await.is_err());
    }

    #[tokio::test]
    async fn listing_rejects_unknown_sort_fields_and_orders() {
        let root = TempDir::new().expect("create temp dir");
        assert!(run(&root, &["tools", "list", "--sort-by", "color"]).await.is_err());
        assert!(Cli::try_parse_from(["ts-cli", "tools", "list", "--order", "sideways"]).is_err());
    }
}
