use async_trait::async_trait;

use crate::application::repos::{ArticleStore, ArticleWriteTx, RepoError};
use crate::domain::entities::{ArticleRecord, PublishedArticleRecord};

use super::super::{PostgresRepositories, map_sqlx_error};
use super::PgArticleTx;
use super::types::{ARTICLE_COLUMNS, ArticleRow, PublishedArticleRow};

#[async_trait]
impl ArticleStore for PostgresRepositories {
    async fn begin(&self) -> Result<Box<dyn ArticleWriteTx>, RepoError> {
        let tx = PostgresRepositories::begin(self)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(PgArticleTx::new(tx)))
    }

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn find_published(&self, id: i64) -> Result<Option<PublishedArticleRecord>, RepoError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM published_articles WHERE id = $1");
        let row = sqlx::query_as::<_, PublishedArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, RepoError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE author_id = $1 \
             ORDER BY updated_at DESC \
             OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(author_id)
            .bind(i64::from(offset))
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
