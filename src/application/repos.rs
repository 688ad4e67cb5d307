//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ArticleDraft, ArticleRecord, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    /// An author-filtered write matched no row: the caller does not own the article.
    #[error("author {author_id} attempted to modify article {id} they do not own")]
    IncorrectAuthor { id: i64, author_id: i64 },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RepoError::Persistence(_) => "persistence",
            RepoError::Duplicate { .. } => "duplicate",
            RepoError::NotFound => "not_found",
            RepoError::IncorrectAuthor { .. } => "incorrect_author",
            RepoError::Timeout => "timeout",
        }
    }
}

/// Writes executed inside one storage transaction.
///
/// Every write to an existing row moves its `updated_at` strictly forward: the
/// stored value becomes `now`, or one past the previous value if that is later.
///
/// Dropping the transaction without calling [`ArticleWriteTx::commit`] rolls back
/// every write made through it.
#[async_trait]
pub trait ArticleWriteTx: Send {
    /// Insert a new draft stamped with `now` and return the stored row with its generated id.
    async fn insert_article(
        &mut self,
        draft: &ArticleDraft,
        now: i64,
    ) -> Result<ArticleRecord, RepoError>;

    /// Overwrite title, content and status of the draft matching `(id, author_id)`.
    ///
    /// Returns `None` when no row matched the filter.
    async fn update_article(
        &mut self,
        draft: &ArticleDraft,
        now: i64,
    ) -> Result<Option<ArticleRecord>, RepoError>;

    /// Insert the published row, or overwrite title, content, status and `updated_at`
    /// of the existing one. Returns the row as stored.
    async fn upsert_published(
        &mut self,
        record: &PublishedArticleRecord,
    ) -> Result<PublishedArticleRecord, RepoError>;

    /// Set status and `updated_at` on the draft matching `(id, author_id)`; returns rows affected.
    async fn update_article_status(
        &mut self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
        now: i64,
    ) -> Result<u64, RepoError>;

    /// Set status and `updated_at` on the published row matching `(id, author_id)`; returns rows affected.
    async fn update_published_status(
        &mut self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
        now: i64,
    ) -> Result<u64, RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ArticleWriteTx>, RepoError>;

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    async fn find_published(&self, id: i64) -> Result<Option<PublishedArticleRecord>, RepoError>;

    /// Drafts of one author, `updated_at` descending. Order among equal timestamps is unspecified.
    async fn list_by_author(
        &self,
        author_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, RepoError>;
}

/// Resolves author ids to display names.
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    async fn find_name(&self, author_id: i64) -> Result<String, RepoError>;
}
