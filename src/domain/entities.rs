//! Domain entities mirrored from persistent storage.
//!
//! Drafts and published articles live in separate tables. They are kept as two
//! distinct record types; the only way to derive a published row from a draft is
//! [`PublishedArticleRecord::project`].

use serde::{Deserialize, Serialize};

use crate::domain::types::ArticleStatus;

/// Row of the author-private `articles` table. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub status: ArticleStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Row of the reader-visible `published_articles` table. Shares its id with the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArticleRecord {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub status: ArticleStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PublishedArticleRecord {
    /// Build the published projection of a committed draft, stamped with `now`.
    ///
    /// Both timestamps are set to `now`; when the row already exists the upsert keeps
    /// its original `created_at`.
    pub fn project(draft: &ArticleRecord, now: i64) -> Self {
        Self {
            id: draft.id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            author_id: draft.author_id,
            status: draft.status,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Author input for a draft write. `id == 0` means the draft does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
    pub status: ArticleStatus,
}

impl ArticleDraft {
    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}
