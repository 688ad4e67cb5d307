use async_trait::async_trait;

use crate::application::repos::{AuthorDirectory, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl AuthorDirectory for PostgresRepositories {
    async fn find_name(&self, author_id: i64) -> Result<String, RepoError> {
        sqlx::query_scalar::<_, String>("SELECT nickname FROM users WHERE id = $1")
            .bind(author_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)
    }
}
