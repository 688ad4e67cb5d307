use std::error::Error as StdError;

use thiserror::Error;
use tracing::{error, warn};

use crate::application::repos::RepoError;

/// Internal diagnostics kept alongside a public error; never shown to callers.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub kind: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, kind: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            kind,
            messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicErrorKind {
    NotFound,
    Internal,
}

/// Failure as an external caller may see it.
///
/// Ownership violations collapse into [`PublicErrorKind::Internal`] so callers cannot
/// discover which article ids belong to other authors; the [`ErrorReport`] keeps the real kind.
#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct PublicError {
    kind: PublicErrorKind,
    public_message: &'static str,
    report: ErrorReport,
}

impl PublicError {
    pub fn from_repo(source: &'static str, err: &RepoError) -> Self {
        let report = ErrorReport::from_error(source, err.kind(), err);
        let (kind, public_message) = match err {
            RepoError::NotFound => (PublicErrorKind::NotFound, "Article not found"),
            RepoError::IncorrectAuthor { id, author_id } => {
                warn!(
                    source,
                    kind = report.kind,
                    article_id = id,
                    author_id,
                    "rejected write to an article owned by another author"
                );
                (PublicErrorKind::Internal, "Internal server error")
            }
            _ => {
                error!(source, kind = report.kind, error = %err, "article operation failed");
                (PublicErrorKind::Internal, "Internal server error")
            }
        };

        Self {
            kind,
            public_message,
            report,
        }
    }

    pub fn kind(&self) -> PublicErrorKind {
        self.kind
    }

    pub fn public_message(&self) -> &'static str {
        self.public_message
    }

    pub fn report(&self) -> &ErrorReport {
        &self.report
    }
}
