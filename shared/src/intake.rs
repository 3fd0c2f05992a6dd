//! Write-mostly intake: feedback, tool reports and contact messages.
//!
//! Submissions land at status `new` with a server-stamped `createdAt`.
//! Administrators move them forward; nothing moves back to `new` and
//! `createdAt` is never rewritten.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::{
    collections::{CONTACTS, FEEDBACK, TOOL_REPORTS},
    error::DirectoryError,
    models::{
        Contact, ContactStatus, Feedback, FeedbackStatus, IntakeStatus, NewContact, NewFeedback,
        NewToolReport, ReportStatus, ToolReport,
    },
    store::{OrderBy, Patch, Query},
    Directory,
};

pub fn validate_transition<S: IntakeStatus>(from: S, to: S) -> Result<(), DirectoryError> {
    if to.is_new() || from == to {
        return Err(DirectoryError::invalid_transition(from.as_str(), to.as_str()));
    }
    Ok(())
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DirectoryError::Validation(format!("{what} is required")).into());
    }
    Ok(())
}

impl Directory {
    async fn submit_intake<S: IntakeStatus>(
        &self,
        collection: &str,
        patch: Patch,
        initial: S,
    ) -> Result<String> {
        let patch = patch
            .without("id")
            .set("status", initial.as_str())
            .server_timestamp("createdAt");
        let id = self
            .store()
            .add(collection, patch)
            .await
            .with_context(|| format!("failed to store {collection} submission"))?;
        tracing::info!(collection, id = %id, "intake received");
        Ok(id)
    }

    async fn list_intake<T, S>(&self, collection: &str, status: Option<S>) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        S: IntakeStatus,
    {
        let mut query = Query::new().order_by(OrderBy::desc("createdAt"));
        if let Some(status) = status {
            query = query.where_eq("status", status.as_str());
        }
        let docs = self
            .store()
            .query(collection, &query)
            .await
            .with_context(|| format!("failed to list {collection}"))?;
        Ok(self.decode_all(collection, &docs))
    }

    async fn update_intake_status<S>(
        &self,
        collection: &str,
        id: &str,
        to: S,
        admin_notes: Option<&str>,
    ) -> Result<()>
    where
        S: IntakeStatus + From<String>,
    {
        let doc = self
            .store()
            .get(collection, id)
            .await
            .with_context(|| format!("failed to read {collection}/{id}"))?
            .ok_or_else(|| DirectoryError::not_found(collection, id))?;
        let from = S::from(doc.get_str("status").unwrap_or_default().to_string());
        validate_transition(from, to)?;

        let mut patch = Patch::new()
            .set("status", to.as_str())
            .server_timestamp("updatedAt");
        if let Some(notes) = admin_notes {
            patch = patch.set("adminNotes", notes);
        }
        self.store()
            .update(collection, id, patch)
            .await
            .with_context(|| format!("failed to update {collection}/{id}"))?;
        tracing::info!(collection, id, from = from.as_str(), to = to.as_str(), "intake status changed");
        Ok(())
    }

    pub async fn submit_feedback(&self, feedback: NewFeedback) -> Result<String> {
        require(&feedback.message, "feedback message")?;
        let patch = Patch::from_serializable(&feedback)?;
        self.submit_intake(FEEDBACK, patch, FeedbackStatus::New).await
    }

    pub async fn submit_tool_report(&self, report: NewToolReport) -> Result<String> {
        require(&report.tool_id, "reported tool")?;
        let patch = Patch::from_serializable(&report)?;
        self.submit_intake(TOOL_REPORTS, patch, ReportStatus::New).await
    }

    pub async fn submit_contact_form(&self, contact: NewContact) -> Result<String> {
        require(&contact.name, "contact name")?;
        require(&contact.email, "contact email")?;
        require(&contact.message, "contact message")?;
        let patch = Patch::from_serializable(&contact)?;
        self.submit_intake(CONTACTS, patch, ContactStatus::New).await
    }

    pub async fn list_feedback(&self, status: Option<FeedbackStatus>) -> Result<Vec<Feedback>> {
        self.list_intake(FEEDBACK, status).await
    }

    pub async fn list_tool_reports(&self, status: Option<ReportStatus>) -> Result<Vec<ToolReport>> {
        self.list_intake(TOOL_REPORTS, status).await
    }

    pub async fn list_contacts(&self, status: Option<ContactStatus>) -> Result<Vec<Contact>> {
        self.list_intake(CONTACTS, status).await
    }

    pub async fn update_feedback_status(
        &self,
        id: &str,
        status: FeedbackStatus,
        admin_notes: Option<&str>,
    ) -> Result<()> {
        self.update_intake_status(FEEDBACK, id, status, admin_notes).await
    }

    pub async fn update_tool_report_status(
        &self,
        id: &str,
        status: ReportStatus,
        admin_notes: Option<&str>,
    ) -> Result<()> {
        self.update_intake_status(TOOL_REPORTS, id, status, admin_notes).await
    }

    pub async fn update_contact_status(
        &self,
        id: &str,
        status: ContactStatus,
        admin_notes: Option<&str>,
    ) -> Result<()> {
        self.update_intake_status(CONTACTS, id, status, admin_notes).await
    }
}
