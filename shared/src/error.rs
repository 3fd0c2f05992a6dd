use thiserror::Error;

/// Domain failures that callers may want to branch on.
///
/// Operations return `anyhow::Result`; these variants are raised through
/// `anyhow::Error::from` so they can be recovered with
/// `err.downcast_ref::<DirectoryError>()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("document already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("invalid page cursor: {0}")]
    InvalidCursor(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DirectoryError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(collection: &str, id: &str) -> Self {
        Self::AlreadyExists {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Returns true when `err` (or anything in its context chain) is a
/// [`DirectoryError::NotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(cause.downcast_ref::<DirectoryError>(), Some(DirectoryError::NotFound { .. }))
    })
}

pub fn is_already_exists(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<DirectoryError>(),
            Some(DirectoryError::AlreadyExists { .. })
        )
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn not_found_survives_added_context() {
        let err: anyhow::Result<()> =
            Err(anyhow::Error::from(DirectoryError::not_found("tools", "t1")));
        let err = err.context("failed to approve submission").unwrap_err();
        assert!(is_not_found(&err));
        assert!(!is_already_exists(&err));
    }

    #[test]
    fn display_names_collection_and_id() {
        let err = DirectoryError::already_exists("bookmarks", "bm-1");
        assert_eq!(err.to_string(), "document already exists: bookmarks/bm-1");
    }
}
