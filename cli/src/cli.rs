use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum QueryOutputFormat {
    Table,
    Vertical,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Parser)]
#[command(name = "ts-cli", version, about = "Toolshelf directory CLI")]
pub struct Cli {
    /// SQLite document database path (defaults to `TOOLSHELF_DB_PATH` or
    /// `./data/toolshelf.db`).
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the document database and its schema.
    Init,
    /// Import tools from a JSON or newline-delimited JSON rows file.
    ImportTools {
        /// Rows file path.
        #[arg(long)]
        file: PathBuf,
    },
    /// Browse the tool catalog.
    Tools {
        #[command(subcommand)]
        command: ToolsCommand,
    },
    /// Moderate public tool submissions.
    Submissions {
        #[command(subcommand)]
        command: SubmissionsCommand,
    },
    /// Read blog posts from both blog collections.
    Blog {
        #[command(subcommand)]
        command: BlogCommand,
    },
    /// List categories with tool counts.
    Categories,
    /// Dump raw documents of one collection.
    Query {
        /// Collection name, e.g. `tools` or `tool_submissions`.
        collection: String,
        /// Maximum documents to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Output format.
        #[arg(long, value_enum, default_value = "table")]
        format: QueryOutputFormat,
    },
}

#[derive(Subcommand)]
pub enum ToolsCommand {
    /// Filtered, sorted and paginated listing.
    List {
        #[arg(long)]
        category: Option<String>,
        /// `active`, `beta`, `discontinued` or `all`.
        #[arg(long)]
        status: Option<String>,
        /// Case-insensitive substring over name, description and tags.
        #[arg(long)]
        search: Option<String>,
        /// createdAt, updatedAt, name, viewCount or rating.
        #[arg(long, default_value = "createdAt")]
        sort_by: String,
        #[arg(long, value_enum, default_value = "desc")]
        order: SortOrder,
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Page size (0 uses the configured default).
        #[arg(long, default_value_t = 0)]
        page_size: usize,
        /// Continue from a page token printed by a previous listing instead
        /// of a page number.
        #[arg(long, conflicts_with = "page")]
        after: Option<String>,
    },
    /// Show one tool by id or slug.
    Get {
        key: String,
    },
    /// Search tools by name, description and tags.
    Search {
        query: String,
    },
}

#[derive(Subcommand)]
pub enum SubmissionsCommand {
    /// List pending and rejected submissions.
    List,
    /// Promote a submission into the catalog.
    Approve {
        id: String,
        /// Moderator user id recorded as `approvedBy`.
        #[arg(long)]
        admin: Option<String>,
    },
    /// Reject a submission, keeping it for audit.
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
        /// Moderator user id recorded as `rejectedBy`.
        #[arg(long)]
        admin: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BlogCommand {
    /// List posts of both collections, newest first.
    List,
    /// Show one post by id, or by slug when published.
    Get {
        key: String,
    },
}
