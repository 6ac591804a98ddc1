use thiserror::Error;

/// Errors surfaced by the caller-facing operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Malformed options, rejected before the repository is touched.
    #[error("Invalid option `{field}`: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    /// The note repository failed. `message` carries the full error chain.
    #[error("Note repository failed during {operation}: {message}")]
    Repository { operation: &'static str, message: String },
}

impl SearchError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SearchError::InvalidOption {
            field,
            reason: reason.into(),
        }
    }

    pub fn repository(operation: &'static str, error: anyhow::Error) -> Self {
        SearchError::Repository {
            operation,
            message: format!("{error:#}"),
        }
    }

    /// Name of the offending option for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SearchError::InvalidOption { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type SearchOutcome<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn repository_error_keeps_context_chain() {
        let low: anyhow::Result<()> = Err(anyhow::anyhow!("disk I/O error"));
        let err = low.context("Failed to query ZSFNOTE").unwrap_err();
        let wrapped = SearchError::repository("search", err);

        let text = wrapped.to_string();
        assert!(text.contains("during search"));
        assert!(text.contains("Failed to query ZSFNOTE"));
        assert!(text.contains("disk I/O error"));
        assert_eq!(wrapped.field(), None);
    }

    #[test]
    fn invalid_option_names_field() {
        let err = SearchError::invalid("limit", "must be greater than zero");
        assert_eq!(err.field(), Some("limit"));
        assert_eq!(err.to_string(), "Invalid option `limit`: must be greater than zero");
    }
}
