//! Public tool submissions and their moderation.
//!
//! A submission waits in `tool_submissions` until an administrator either
//! promotes it into `tools` (same id, staging record removed in the same
//! batch) or rejects it in place.

use anyhow::{Context, Result};

use crate::{
    collections::{TOOLS, TOOL_SUBMISSIONS},
    error::DirectoryError,
    identity::{actor_uid, Session},
    models::{
        NewTool, SubmissionState, ToolPricing, ToolSubmission, SUBMISSION_STATUS_REJECTED,
        TOOL_STATUS_ACTIVE,
    },
    store::{OrderBy, Patch, Query, WriteOp},
    text::slugify,
    Directory,
};

const PENDING_STATUS: &str = "beta";
const SUBMISSION_ONLY_FIELDS: &[&str] = &[
    "id",
    "submittedBy",
    "submittedAt",
    "approved",
    "rejectionReason",
    "rejectedAt",
    "rejectedBy",
];

impl Directory {
    pub async fn submit_tool(&self, tool: NewTool, session: Option<&Session>) -> Result<String> {
        let mut tool = tool;
        tool.name = tool.name.trim().to_string();
        if tool.name.is_empty() {
            return Err(DirectoryError::Validation("tool name is required".to_string()).into());
        }
        if tool.slug.trim().is_empty() {
            tool.slug = slugify(&tool.name);
        }
        if tool.pricing.is_empty() {
            tool.pricing.push(ToolPricing::Free);
        }
        let submitter = actor_uid(session);
        let patch = Patch::from_serializable(&tool)?
            .set("status", PENDING_STATUS)
            .set("approved", false)
            .set("submittedBy", submitter)
            .server_timestamp("submittedAt")
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");
        let id = self
            .store()
            .add(TOOL_SUBMISSIONS, patch)
            .await
            .with_context(|| format!("failed to store submission {}", tool.name))?;
        tracing::info!(id = %id, submitter, "tool submitted");
        Ok(id)
    }

    /// Pending and rejected submissions, newest first.
    pub async fn get_submitted_tools(&self) -> Result<Vec<ToolSubmission>> {
        let docs = self
            .store()
            .query(
                TOOL_SUBMISSIONS,
                &Query::new().order_by(OrderBy::desc("submittedAt")),
            )
            .await
            .context("failed to list submissions")?;
        Ok(self.decode_all(TOOL_SUBMISSIONS, &docs))
    }

    async fn pending_submission(&self, id: &str, action: &str) -> Result<crate::store::Document> {
        let doc = self
            .store()
            .get(TOOL_SUBMISSIONS, id)
            .await
            .with_context(|| format!("failed to read submission {id}"))?
            .ok_or_else(|| DirectoryError::not_found(TOOL_SUBMISSIONS, id))?;
        let submission: ToolSubmission = doc.decode()?;
        if submission.state() == SubmissionState::Rejected {
            return Err(DirectoryError::invalid_transition(SUBMISSION_STATUS_REJECTED, action).into());
        }
        Ok(doc)
    }

    /// Promotes a pending submission to an active tool under the same id.
    /// The tool write and the staging delete commit together; approving an
    /// id a second time fails with not-found, and a rejection that lands
    /// first fails the approval with an invalid transition.
    pub async fn approve_tool(&self, id: &str, session: Option<&Session>) -> Result<()> {
        let doc = self.pending_submission(id, TOOL_STATUS_ACTIVE).await?;
        let approver = actor_uid(session);

        let mut fields = doc.fields;
        for key in SUBMISSION_ONLY_FIELDS {
            fields.remove(*key);
        }
        let missing_slug = fields
            .get("slug")
            .and_then(|v| v.as_str())
            .map_or(true, |s| s.trim().is_empty());
        let name = fields
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let has_views = fields.contains_key("viewCount");

        let mut patch = Patch::from_fields(fields)
            .set("status", TOOL_STATUS_ACTIVE)
            .set("approved", true)
            .set("approvedBy", approver)
            .server_timestamp("approvedAt")
            .server_timestamp("createdAt")
            .server_timestamp("updatedAt");
        if missing_slug {
            patch = patch.set("slug", slugify(&name));
        }
        if !has_views {
            patch = patch.set("viewCount", 0);
        }

        self.store()
            .commit(vec![
                // Re-checked inside the batch: a concurrent approval removes
                // the staging record and a concurrent rejection marks it.
                WriteOp::Guard {
                    collection: TOOL_SUBMISSIONS.to_string(),
                    id: id.to_string(),
                    field: "status".to_string(),
                    forbidden: SUBMISSION_STATUS_REJECTED.into(),
                    to: TOOL_STATUS_ACTIVE.to_string(),
                },
                WriteOp::Set {
                    collection: TOOLS.to_string(),
                    id: id.to_string(),
                    patch,
                },
                WriteOp::Delete {
                    collection: TOOL_SUBMISSIONS.to_string(),
                    id: id.to_string(),
                },
            ])
            .await
            .with_context(|| format!("failed to promote submission {id}"))?;

        if self.search_index().is_built().await {
            if let Some(tool) = self.store().get(TOOLS, id).await? {
                self.search_index().upsert(&tool).await;
            }
        }
        tracing::info!(id, approver, name = %name, "submission approved");
        Ok(())
    }

    /// Annotates the submission as rejected and keeps it for audit.
    pub async fn reject_tool(&self, id: &str, reason: &str, session: Option<&Session>) -> Result<()> {
        self.pending_submission(id, SUBMISSION_STATUS_REJECTED).await?;
        let rejecter = actor_uid(session);
        let patch = Patch::new()
            .set("status", SUBMISSION_STATUS_REJECTED)
            .set("rejectionReason", reason.trim())
            .set("rejectedBy", rejecter)
            .server_timestamp("rejectedAt")
            .server_timestamp("updatedAt");
        self.store()
            .update(TOOL_SUBMISSIONS, id, patch)
            .await
            .with_context(|| format!("failed to reject submission {id}"))?;
        tracing::info!(id, rejecter, "submission rejected");
        Ok(())
    }
}
