use serde::{Deserialize, Serialize};

use crate::models::ANONYMOUS_SUBMITTER;

/// Authenticated caller as reported by the identity provider. Read-only
/// here; used to stamp `submittedBy`/`approvedBy`/`rejectedBy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

pub fn actor_uid(session: Option<&Session>) -> &str {
    session
        .map(|s| s.uid.as_str())
        .filter(|uid| !uid.trim().is_empty())
        .unwrap_or(ANONYMOUS_SUBMITTER)
}
