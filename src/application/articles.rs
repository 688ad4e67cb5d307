//! Cache-aside article repository.
//!
//! Reads try the cache first and fall back to storage; writes go to storage and
//! then invalidate the cached listings they may have changed. Cache failures
//! never fail an operation: they are logged, counted and treated as a miss.
//! Population after a read runs in the background and never delays the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use crate::application::background::{BackgroundTasks, TaskError};
use crate::application::repos::{ArticleStore, AuthorDirectory, RepoError};
use crate::application::sync::ArticleSync;
use crate::cache::{ArticleCache, CacheError};
use crate::domain::articles::Article;
use crate::domain::entities::{ArticleDraft, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;

pub(crate) const METRIC_CACHE_ERROR_TOTAL: &str = "webook_article_cache_error_total";

/// The listing window that gets its own cache entry.
pub const FIRST_PAGE_OFFSET: u32 = 0;
pub const FIRST_PAGE_LIMIT: u32 = 100;

/// Articles with more content than this are never put in the single-article cache.
pub const MAX_CACHED_CONTENT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct RepositoryConfig {
    /// Deadline for each store or cache call made on the caller's path.
    pub operation_timeout: Option<Duration>,
}

impl From<&crate::config::ArticlesSettings> for RepositoryConfig {
    fn from(settings: &crate::config::ArticlesSettings) -> Self {
        Self {
            operation_timeout: settings.operation_timeout,
        }
    }
}

#[derive(Clone)]
pub struct ArticleRepository {
    sync: ArticleSync,
    store: Arc<dyn ArticleStore>,
    cache: ArticleCache,
    authors: Arc<dyn AuthorDirectory>,
    tasks: BackgroundTasks,
    operation_timeout: Option<Duration>,
}

impl ArticleRepository {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        cache: ArticleCache,
        authors: Arc<dyn AuthorDirectory>,
        tasks: BackgroundTasks,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            sync: ArticleSync::new(Arc::clone(&store)),
            store,
            cache,
            authors,
            tasks,
            operation_timeout: config.operation_timeout,
        }
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    pub async fn create(&self, draft: &ArticleDraft) -> Result<i64, RepoError> {
        let record = self.deadline(self.sync.insert(draft)).await?;
        self.invalidate_first_page(record.author_id).await;
        Ok(record.id)
    }

    /// Update a draft owned by `draft.author_id`.
    ///
    /// The single-article entry is left to expire; only the listing is invalidated.
    pub async fn update(&self, draft: &ArticleDraft) -> Result<(), RepoError> {
        let record = self.deadline(self.sync.update(draft)).await?;
        self.invalidate_first_page(record.author_id).await;
        Ok(())
    }

    /// Write the draft and its published projection, then warm the published
    /// entry in the background so the first public read is served from cache.
    pub async fn sync(&self, draft: &ArticleDraft) -> Result<i64, RepoError> {
        let published = self.deadline(self.sync.sync(draft)).await?;
        let id = published.id;
        self.invalidate_first_page(published.author_id).await;
        self.warm_published(published);
        Ok(id)
    }

    pub async fn sync_status(
        &self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
    ) -> Result<i64, RepoError> {
        let id = self
            .deadline(self.sync.sync_status(author_id, id, status))
            .await?;

        self.invalidate("delete", id, self.cache.delete(id)).await;
        self.invalidate("delete_published", id, self.cache.delete_published(id))
            .await;
        self.invalidate_first_page(author_id).await;
        Ok(id)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Article, RepoError> {
        if let Some(article) = self.cached("get", id, self.cache.get(id)).await {
            return Ok(article);
        }

        let record = self
            .deadline(self.store.find_article(id))
            .await?
            .ok_or(RepoError::NotFound)?;
        let article = Article::from(record);
        self.pre_cache(article.clone());
        Ok(article)
    }

    /// Published view with the author's display name attached.
    pub async fn get_published_by_id(&self, id: i64) -> Result<Article, RepoError> {
        if let Some(article) = self
            .cached("get_published", id, self.cache.get_published(id))
            .await
        {
            return Ok(article);
        }

        let record = self
            .deadline(self.store.find_published(id))
            .await?
            .ok_or(RepoError::NotFound)?;
        let name = self
            .deadline(self.authors.find_name(record.author_id))
            .await?;
        let article = Article::published(record.clone(), name.clone());

        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();
        self.tasks.submit("cache_published", async move {
            store_published(&*store, &cache, record, name).await
        });
        Ok(article)
    }

    /// Drafts of `author_id`, most recently updated first.
    pub async fn list(
        &self,
        author_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Article>, RepoError> {
        let first_page = offset == FIRST_PAGE_OFFSET && limit == FIRST_PAGE_LIMIT;
        if first_page {
            if let Some(articles) = self
                .cached("get_first_page", author_id, self.cache.get_first_page(author_id))
                .await
            {
                return Ok(articles);
            }
        }

        let records = self
            .deadline(self.store.list_by_author(author_id, offset, limit))
            .await?;
        let articles: Vec<Article> = records.into_iter().map(Article::from).collect();

        if let Some(first) = articles.first() {
            self.pre_cache(first.clone());
        }
        if first_page {
            let cache = self.cache.clone();
            let page = articles.clone();
            self.tasks.submit("cache_first_page", async move {
                cache.set_first_page(author_id, &page).await?;
                Ok(())
            });
        }
        Ok(articles)
    }

    fn pre_cache(&self, article: Article) {
        if article.content.len() > MAX_CACHED_CONTENT_BYTES {
            debug!(
                article_id = article.id,
                content_bytes = article.content.len(),
                "article too large for cache"
            );
            return;
        }
        let cache = self.cache.clone();
        self.tasks.submit("cache_article", async move {
            cache.set(&article).await?;
            Ok(())
        });
    }

    /// The entry is only written when the author lookup succeeds.
    fn warm_published(&self, published: PublishedArticleRecord) {
        let store = Arc::clone(&self.store);
        let cache = self.cache.clone();
        let authors = Arc::clone(&self.authors);
        self.tasks.submit("warm_published", async move {
            let name = authors.find_name(published.author_id).await?;
            store_published(&*store, &cache, published, name).await
        });
    }

    async fn invalidate_first_page(&self, author_id: i64) {
        self.invalidate(
            "delete_first_page",
            author_id,
            self.cache.delete_first_page(author_id),
        )
        .await;
    }

    /// Run a cache delete on the caller's path. Errors and timeouts are swallowed.
    async fn invalidate(
        &self,
        op: &'static str,
        key_id: i64,
        delete: impl Future<Output = Result<(), CacheError>>,
    ) {
        if let Some(Err(err)) = self.bounded(op, key_id, delete).await {
            cache_failure(op, key_id, &err);
        }
    }

    /// Run a cache read on the caller's path. Errors and timeouts become a miss.
    async fn cached<T>(
        &self,
        op: &'static str,
        key_id: i64,
        lookup: impl Future<Output = Result<Option<T>, CacheError>>,
    ) -> Option<T> {
        match self.bounded(op, key_id, lookup).await? {
            Ok(value) => value,
            Err(err) => {
                cache_failure(op, key_id, &err);
                None
            }
        }
    }

    /// `None` when the cache call overran the operation timeout.
    async fn bounded<T>(
        &self,
        op: &'static str,
        key_id: i64,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Option<Result<T, CacheError>> {
        let Some(limit) = self.operation_timeout else {
            return Some(call.await);
        };
        match tokio::time::timeout(limit, call).await {
            Ok(outcome) => Some(outcome),
            Err(_) => {
                warn!(op, id = key_id, "cache call timed out; continuing without cache");
                counter!(METRIC_CACHE_ERROR_TOTAL, "op" => op).increment(1);
                None
            }
        }
    }

    async fn deadline<T>(
        &self,
        operation: impl Future<Output = Result<T, RepoError>>,
    ) -> Result<T, RepoError> {
        match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| RepoError::Timeout)?,
            None => operation.await,
        }
    }
}

/// Cache the published view of `record`, then drop it again if storage no
/// longer holds that exact row. A status change committing before the recheck
/// is caught here; one committing after it invalidates the entry itself.
async fn store_published(
    store: &dyn ArticleStore,
    cache: &ArticleCache,
    record: PublishedArticleRecord,
    author_name: String,
) -> Result<(), TaskError> {
    let id = record.id;
    cache
        .set_published(&Article::published(record.clone(), author_name))
        .await?;

    if store.find_published(id).await?.as_ref() != Some(&record) {
        debug!(article_id = id, "published row changed while caching; entry dropped");
        cache.delete_published(id).await?;
    }
    Ok(())
}

fn cache_failure(op: &'static str, id: i64, err: &CacheError) {
    warn!(op, id, error = %err, "cache operation failed; continuing without cache");
    counter!(METRIC_CACHE_ERROR_TOTAL, "op" => op).increment(1);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::application::background::BackgroundConfig;
    use crate::cache::{CacheConfig, CacheStore, MemoryCacheStore};
    use crate::infra::memory::InMemoryArticleStore;

    /// Cache backend that fails every call and records which keys were touched.
    #[derive(Default)]
    struct BrokenCache {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.calls.lock().unwrap().push(format!("get {key}"));
            Err(CacheError::backend("connection refused"))
        }

        async fn set(&self, key: &str, _: Vec<u8>, _: Duration) -> Result<(), CacheError> {
            self.calls.lock().unwrap().push(format!("set {key}"));
            Err(CacheError::backend("connection refused"))
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.calls.lock().unwrap().push(format!("delete {key}"));
            Err(CacheError::backend("connection refused"))
        }
    }

    fn repository(
        store: &InMemoryArticleStore,
        cache_store: Arc<dyn CacheStore>,
    ) -> ArticleRepository {
        ArticleRepository::new(
            Arc::new(store.clone()),
            ArticleCache::new(cache_store, Duration::from_secs(60)),
            Arc::new(store.clone()),
            BackgroundTasks::new(BackgroundConfig::default()),
            RepositoryConfig::default(),
        )
    }

    fn draft(id: i64, author_id: i64, content: &str) -> ArticleDraft {
        ArticleDraft {
            id,
            title: "title".into(),
            content: content.into(),
            author_id,
            status: ArticleStatus::Unpublished,
        }
    }

    #[tokio::test]
    async fn broken_cache_never_fails_the_operation() {
        let store = InMemoryArticleStore::new();
        store.insert_author(3, "grace").await;
        let cache = Arc::new(BrokenCache::default());
        let repo = repository(&store, cache.clone());

        let id = repo.create(&draft(0, 3, "body")).await.expect("create");
        repo.update(&draft(id, 3, "edited")).await.expect("update");
        assert_eq!(repo.get_by_id(id).await.expect("get").content, "edited");
        assert_eq!(repo.list(3, 0, 100).await.expect("list").len(), 1);

        let published = ArticleDraft {
            status: ArticleStatus::Published,
            ..draft(id, 3, "edited")
        };
        repo.sync(&published).await.expect("sync");
        let view = repo.get_published_by_id(id).await.expect("published");
        assert_eq!(view.author.name, "grace");
        repo.tasks().wait_idle().await;

        let calls = cache.calls.lock().unwrap();
        assert!(calls.contains(&"delete article:first_page:3".to_string()));
        assert!(calls.contains(&format!("get article:{id}")));
    }

    #[tokio::test]
    async fn update_leaves_single_article_entry_alone() {
        let store = InMemoryArticleStore::new();
        let cache_store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let repo = repository(&store, cache_store.clone());

        let id = repo.create(&draft(0, 5, "v1")).await.expect("create");
        repo.get_by_id(id).await.expect("warm");
        repo.tasks().wait_idle().await;

        repo.update(&draft(id, 5, "v2")).await.expect("update");
        assert_eq!(repo.get_by_id(id).await.expect("stale read").content, "v1");
    }

    #[tokio::test]
    async fn sync_status_drops_cached_views() {
        let store = InMemoryArticleStore::new();
        store.insert_author(5, "ada").await;
        let cache_store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let repo = repository(&store, cache_store.clone());

        let published = ArticleDraft {
            status: ArticleStatus::Published,
            ..draft(0, 5, "body")
        };
        let id = repo.sync(&published).await.expect("publish");
        repo.get_by_id(id).await.expect("warm draft");
        repo.tasks().wait_idle().await;
        assert!(cache_store.contains(&format!("article:pub:{id}")));

        repo.sync_status(5, id, ArticleStatus::Private)
            .await
            .expect("withdraw");

        assert!(!cache_store.contains(&format!("article:{id}")));
        assert!(!cache_store.contains(&format!("article:pub:{id}")));
        let view = repo.get_published_by_id(id).await.expect("read through");
        assert_eq!(view.status, ArticleStatus::Private);
    }

    #[tokio::test]
    async fn missing_author_fails_the_published_read() {
        let store = InMemoryArticleStore::new();
        let cache_store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let repo = repository(&store, cache_store.clone());

        let published = ArticleDraft {
            status: ArticleStatus::Published,
            ..draft(0, 8, "body")
        };
        let id = repo.sync(&published).await.expect("publish");
        repo.tasks().wait_idle().await;

        assert!(!cache_store.contains(&format!("article:pub:{id}")));
        assert!(matches!(
            repo.get_published_by_id(id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn missing_draft_is_not_found() {
        let store = InMemoryArticleStore::new();
        let cache_store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let repo = repository(&store, cache_store);

        assert!(matches!(repo.get_by_id(404).await, Err(RepoError::NotFound)));
    }

    /// Author directory that holds every lookup until a permit is added.
    struct GatedAuthors {
        inner: InMemoryArticleStore,
        gate: Semaphore,
    }

    #[async_trait]
    impl AuthorDirectory for GatedAuthors {
        async fn find_name(&self, author_id: i64) -> Result<String, RepoError> {
            let _open = self.gate.acquire().await.expect("gate stays open");
            self.inner.find_name(author_id).await
        }
    }

    /// Cache backend whose deletes never complete.
    struct HungDeletes;

    #[async_trait]
    impl CacheStore for HungDeletes {
        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Ok(None)
        }

        async fn set(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), CacheError> {
            Ok(())
        }

        async fn delete(&self, _: &str) -> Result<(), CacheError> {
            std::future::pending::<Result<(), CacheError>>().await
        }
    }

    fn published(id: i64, author_id: i64) -> ArticleDraft {
        ArticleDraft {
            status: ArticleStatus::Published,
            ..draft(id, author_id, "body")
        }
    }

    #[tokio::test]
    async fn withdraw_before_the_published_warm_runs_is_not_undone() {
        let store = InMemoryArticleStore::new();
        store.insert_author(5, "ada").await;
        let cache_store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let authors = Arc::new(GatedAuthors {
            inner: store.clone(),
            gate: Semaphore::new(0),
        });
        let repo = ArticleRepository::new(
            Arc::new(store.clone()),
            ArticleCache::new(cache_store.clone(), Duration::from_secs(60)),
            authors.clone(),
            BackgroundTasks::new(BackgroundConfig::default()),
            RepositoryConfig::default(),
        );

        let id = repo.sync(&published(0, 5)).await.expect("publish");
        repo.sync_status(5, id, ArticleStatus::Private)
            .await
            .expect("withdraw");
        authors.gate.add_permits(1);
        repo.tasks().wait_idle().await;

        assert!(!cache_store.contains(&format!("article:pub:{id}")));
        let view = repo.get_published_by_id(id).await.expect("read through");
        assert_eq!(view.status, ArticleStatus::Private);
    }

    #[tokio::test]
    async fn published_read_followed_by_withdraw_leaves_no_stale_entry() {
        let store = InMemoryArticleStore::new();
        store.insert_author(5, "ada").await;
        let cache_store = Arc::new(MemoryCacheStore::new(&CacheConfig::default()));
        let repo = repository(&store, cache_store.clone());

        let id = repo.sync(&published(0, 5)).await.expect("publish");
        repo.tasks().wait_idle().await;
        cache_store
            .delete(&format!("article:pub:{id}"))
            .await
            .expect("evict");

        let view = repo.get_published_by_id(id).await.expect("cold read");
        assert_eq!(view.status, ArticleStatus::Published);
        repo.sync_status(5, id, ArticleStatus::Private)
            .await
            .expect("withdraw");
        repo.tasks().wait_idle().await;

        let view = repo.get_published_by_id(id).await.expect("read after withdraw");
        assert_eq!(view.status, ArticleStatus::Private);
    }

    #[tokio::test]
    async fn hung_cache_deletes_do_not_stall_committed_writes() {
        let store = InMemoryArticleStore::new();
        store.insert_author(2, "lin").await;
        let repo = ArticleRepository::new(
            Arc::new(store.clone()),
            ArticleCache::new(Arc::new(HungDeletes), Duration::from_secs(60)),
            Arc::new(store.clone()),
            BackgroundTasks::new(BackgroundConfig::default()),
            RepositoryConfig {
                operation_timeout: Some(Duration::from_millis(20)),
            },
        );
        let bound = Duration::from_secs(2);

        let id = tokio::time::timeout(bound, repo.create(&draft(0, 2, "body")))
            .await
            .expect("create returns")
            .expect("create");
        tokio::time::timeout(bound, repo.update(&draft(id, 2, "edited")))
            .await
            .expect("update returns")
            .expect("update");
        tokio::time::timeout(bound, repo.sync(&published(id, 2)))
            .await
            .expect("sync returns")
            .expect("sync");
        tokio::time::timeout(bound, repo.sync_status(2, id, ArticleStatus::Private))
            .await
            .expect("sync_status returns")
            .expect("sync_status");

        let stored = store
            .find_published(id)
            .await
            .expect("read")
            .expect("published row");
        assert_eq!(stored.status, ArticleStatus::Private);
        assert_eq!(stored.content, "body");
    }
}
