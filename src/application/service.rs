//! Author workflow: save a draft, publish it, withdraw it.
//!
//! The service picks the status for each transition and maps repository failures
//! to [`PublicError`], so callers outside the core never learn why a write was
//! rejected.

use crate::application::articles::ArticleRepository;
use crate::application::error::PublicError;
use crate::domain::articles::Article;
use crate::domain::entities::ArticleDraft;
use crate::domain::types::ArticleStatus;

/// Input for `save` and `publish`. An `id` of zero creates a new article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditArticleCommand {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author_id: i64,
}

impl EditArticleCommand {
    fn into_draft(self, status: ArticleStatus) -> ArticleDraft {
        ArticleDraft {
            id: self.id,
            title: self.title,
            content: self.content,
            author_id: self.author_id,
            status,
        }
    }
}

#[derive(Clone)]
pub struct ArticleService {
    repo: ArticleRepository,
}

impl ArticleService {
    pub fn new(repo: ArticleRepository) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &ArticleRepository {
        &self.repo
    }

    /// Store the draft as unpublished. Returns the article id.
    pub async fn save(&self, command: EditArticleCommand) -> Result<i64, PublicError> {
        let draft = command.into_draft(ArticleStatus::Unpublished);
        if draft.is_new() {
            return self
                .repo
                .create(&draft)
                .await
                .map_err(|err| PublicError::from_repo("application::service::save", &err));
        }

        self.repo
            .update(&draft)
            .await
            .map_err(|err| PublicError::from_repo("application::service::save", &err))?;
        Ok(draft.id)
    }

    pub async fn publish(&self, command: EditArticleCommand) -> Result<i64, PublicError> {
        let draft = command.into_draft(ArticleStatus::Published);
        self.repo
            .sync(&draft)
            .await
            .map_err(|err| PublicError::from_repo("application::service::publish", &err))
    }

    /// Make a published article private again.
    pub async fn withdraw(&self, author_id: i64, id: i64) -> Result<i64, PublicError> {
        self.repo
            .sync_status(author_id, id, ArticleStatus::Private)
            .await
            .map_err(|err| PublicError::from_repo("application::service::withdraw", &err))
    }

    pub async fn list(
        &self,
        author_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Article>, PublicError> {
        self.repo
            .list(author_id, offset, limit)
            .await
            .map_err(|err| PublicError::from_repo("application::service::list", &err))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Article, PublicError> {
        self.repo
            .get_by_id(id)
            .await
            .map_err(|err| PublicError::from_repo("application::service::get_by_id", &err))
    }

    pub async fn get_published_by_id(&self, id: i64) -> Result<Article, PublicError> {
        self.repo.get_published_by_id(id).await.map_err(|err| {
            PublicError::from_repo("application::service::get_published_by_id", &err)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::application::articles::RepositoryConfig;
    use crate::application::background::BackgroundTasks;
    use crate::application::error::PublicErrorKind;
    use crate::application::repos::ArticleStore;
    use crate::cache::{ArticleCache, CacheConfig, MemoryCacheStore};
    use crate::infra::memory::InMemoryArticleStore;

    fn service(store: &InMemoryArticleStore) -> ArticleService {
        let cache = ArticleCache::new(
            Arc::new(MemoryCacheStore::new(&CacheConfig::default())),
            Duration::from_secs(60),
        );
        ArticleService::new(ArticleRepository::new(
            Arc::new(store.clone()),
            cache,
            Arc::new(store.clone()),
            BackgroundTasks::default(),
            RepositoryConfig::default(),
        ))
    }

    fn command(id: i64, author_id: i64, title: &str) -> EditArticleCommand {
        EditArticleCommand {
            id,
            title: title.into(),
            content: "content".into(),
            author_id,
        }
    }

    #[tokio::test]
    async fn save_forces_unpublished_and_updates_in_place() {
        let store = InMemoryArticleStore::new();
        let service = service(&store);

        let id = service.save(command(0, 1, "draft")).await.expect("create");
        let again = service.save(command(id, 1, "edited")).await.expect("update");
        assert_eq!(again, id);

        let stored = store.find_article(id).await.expect("read").expect("row");
        assert_eq!(stored.title, "edited");
        assert_eq!(stored.status, ArticleStatus::Unpublished);
        assert_eq!(store.published_count().await, 0);
    }

    #[tokio::test]
    async fn publish_then_withdraw() {
        let store = InMemoryArticleStore::new();
        store.insert_author(1, "ada").await;
        let service = service(&store);

        let id = service.publish(command(0, 1, "post")).await.expect("publish");
        let published = store.find_published(id).await.expect("read").expect("row");
        assert_eq!(published.status, ArticleStatus::Published);

        service.withdraw(1, id).await.expect("withdraw");
        let draft = store.find_article(id).await.expect("read").expect("row");
        let published = store.find_published(id).await.expect("read").expect("row");
        assert_eq!(draft.status, ArticleStatus::Private);
        assert_eq!(published.status, ArticleStatus::Private);
    }

    #[tokio::test]
    async fn foreign_writes_look_like_internal_errors() {
        let store = InMemoryArticleStore::new();
        let service = service(&store);
        let id = service.publish(command(0, 1, "mine")).await.expect("publish");

        let save = service
            .save(command(id, 2, "hijack"))
            .await
            .expect_err("foreign save");
        let withdraw = service.withdraw(2, id).await.expect_err("foreign withdraw");

        for err in [save, withdraw] {
            assert_eq!(err.kind(), PublicErrorKind::Internal);
            assert_eq!(err.public_message(), "Internal server error");
            assert_eq!(err.report().kind, "incorrect_author");
        }
    }

    #[tokio::test]
    async fn missing_article_is_not_found() {
        let store = InMemoryArticleStore::new();
        let service = service(&store);

        let err = service.get_by_id(77).await.expect_err("missing");
        assert_eq!(err.kind(), PublicErrorKind::NotFound);
    }
}
