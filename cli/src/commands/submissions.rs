use anyhow::Result;
use toolshelf_shared::{Directory, Session};

use crate::{
    cli::SubmissionsCommand,
    utils::{format_table, to_row},
};

pub async fn run(dir: &Directory, command: SubmissionsCommand) -> Result<()> {
    match command {
        SubmissionsCommand::List => {
            let submissions = dir.get_submitted_tools().await?;
            let rows = submissions.iter().map(to_row).collect::<Result<Vec<_>>>()?;
            let table = format_table(
                &["id", "name", "category", "status", "submittedBy", "rejectionReason"],
                &rows,
            );
            tracing::info!("\n{table}");
        },
        SubmissionsCommand::Approve { id, admin } => {
            let session = admin.map(Session::new);
            dir.approve_tool(&id, session.as_ref()).await?;
            tracing::info!("Approved submission {id}");
        },
        SubmissionsCommand::Reject { id, reason, admin } => {
            let session = admin.map(Session::new);
            dir.reject_tool(&id, &reason, session.as_ref()).await?;
            tracing::info!("Rejected submission {id}: {reason}");
        },
    }
    Ok(())
}
