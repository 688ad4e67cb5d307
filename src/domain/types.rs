//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an article, mirrored by Postgres enum `article_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "article_status", rename_all = "snake_case")]
pub enum ArticleStatus {
    Unpublished,
    Published,
    /// Withdrawn from readers; only the author can see it.
    Private,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Unpublished => "unpublished",
            ArticleStatus::Published => "published",
            ArticleStatus::Private => "private",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ArticleStatus {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "unpublished" => Ok(ArticleStatus::Unpublished),
            "published" => Ok(ArticleStatus::Published),
            "private" => Ok(ArticleStatus::Private),
            _ => Err(()),
        }
    }
}
