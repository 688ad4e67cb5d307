//! Article views handed to callers and stored in the cache.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::entities::{ArticleRecord, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;
use crate::util::clock::datetime_from_millis;

const ABSTRACT_CHARS: usize = 100;

/// Read-only projection of the author's identity. Only published views carry a name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

impl Author {
    pub fn anonymous(id: i64) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub author: Author,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Article {
    /// First hundred characters of the content, for listings.
    pub fn abstract_text(&self) -> String {
        self.content.chars().take(ABSTRACT_CHARS).collect()
    }

    /// Attach an author name to a published row.
    pub fn published(record: PublishedArticleRecord, author_name: String) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            status: record.status,
            author: Author {
                id: record.author_id,
                name: author_name,
            },
            created_at: datetime_from_millis(record.created_at),
            updated_at: datetime_from_millis(record.updated_at),
        }
    }
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            status: record.status,
            author: Author::anonymous(record.author_id),
            created_at: datetime_from_millis(record.created_at),
            updated_at: datetime_from_millis(record.updated_at),
        }
    }
}
