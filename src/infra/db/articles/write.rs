use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::application::repos::{ArticleWriteTx, RepoError};
use crate::domain::entities::{ArticleDraft, ArticleRecord, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;

use super::super::map_sqlx_error;
use super::types::{ARTICLE_COLUMNS, ArticleRow, PublishedArticleRow};

/// Article writes sharing one Postgres transaction. Dropped without commit, sqlx rolls it back.
pub(crate) struct PgArticleTx {
    tx: Transaction<'static, Postgres>,
}

impl PgArticleTx {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ArticleWriteTx for PgArticleTx {
    async fn insert_article(
        &mut self,
        draft: &ArticleDraft,
        now: i64,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "INSERT INTO articles (title, content, author_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(&draft.title)
            .bind(&draft.content)
            .bind(draft.author_id)
            .bind(draft.status)
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_article(
        &mut self,
        draft: &ArticleDraft,
        now: i64,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!(
            "UPDATE articles \
             SET title = $3, content = $4, status = $5, \
                 updated_at = GREATEST($6, updated_at + 1) \
             WHERE id = $1 AND author_id = $2 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(draft.id)
            .bind(draft.author_id)
            .bind(&draft.title)
            .bind(&draft.content)
            .bind(draft.status)
            .bind(now)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn upsert_published(
        &mut self,
        record: &PublishedArticleRecord,
    ) -> Result<PublishedArticleRecord, RepoError> {
        let sql = format!(
            "INSERT INTO published_articles \
                 (id, title, content, author_id, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 content = EXCLUDED.content, \
                 status = EXCLUDED.status, \
                 updated_at = GREATEST(EXCLUDED.updated_at, published_articles.updated_at + 1) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PublishedArticleRow>(&sql)
            .bind(record.id)
            .bind(&record.title)
            .bind(&record.content)
            .bind(record.author_id)
            .bind(record.status)
            .bind(record.created_at)
            .bind(record.updated_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_article_status(
        &mut self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
        now: i64,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE articles SET status = $3, updated_at = GREATEST($4, updated_at + 1) \
             WHERE id = $1 AND author_id = $2",
        )
        .bind(id)
        .bind(author_id)
        .bind(status)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn update_published_status(
        &mut self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
        now: i64,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "UPDATE published_articles SET status = $3, updated_at = GREATEST($4, updated_at + 1) \
             WHERE id = $1 AND author_id = $2",
        )
        .bind(id)
        .bind(author_id)
        .bind(status)
        .bind(now)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
