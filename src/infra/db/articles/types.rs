use crate::domain::entities::{ArticleRecord, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;

pub(crate) const ARTICLE_COLUMNS: &str =
    "id, title, content, author_id, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) author_id: i64,
    pub(crate) status: ArticleStatus,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PublishedArticleRow {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) author_id: i64,
    pub(crate) status: ArticleStatus,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

impl From<PublishedArticleRow> for PublishedArticleRecord {
    fn from(row: PublishedArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
