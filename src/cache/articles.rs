//! Typed article cache over a [`CacheStore`].

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::articles::Article;

use super::keys::CacheKey;
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_CACHE_HIT_TOTAL: &str = "webook_article_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS_TOTAL: &str = "webook_article_cache_miss_total";

/// Cache of article views in three key spaces plus author names.
///
/// Every write uses the same fixed expiry. A value that no longer decodes is a miss.
#[derive(Clone)]
pub struct ArticleCache {
    store: Arc<dyn CacheStore>,
    expiry: Duration,
}

impl ArticleCache {
    pub fn new(store: Arc<dyn CacheStore>, expiry: Duration) -> Self {
        Self { store, expiry }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>, CacheError> {
        self.read(CacheKey::Article(id)).await
    }

    pub async fn set(&self, article: &Article) -> Result<(), CacheError> {
        self.write(CacheKey::Article(article.id), article).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), CacheError> {
        self.remove(CacheKey::Article(id)).await
    }

    pub async fn get_published(&self, id: i64) -> Result<Option<Article>, CacheError> {
        self.read(CacheKey::PublishedArticle(id)).await
    }

    pub async fn set_published(&self, article: &Article) -> Result<(), CacheError> {
        self.write(CacheKey::PublishedArticle(article.id), article)
            .await
    }

    pub async fn delete_published(&self, id: i64) -> Result<(), CacheError> {
        self.remove(CacheKey::PublishedArticle(id)).await
    }

    pub async fn get_first_page(&self, author_id: i64) -> Result<Option<Vec<Article>>, CacheError> {
        self.read(CacheKey::FirstPage(author_id)).await
    }

    pub async fn set_first_page(
        &self,
        author_id: i64,
        articles: &[Article],
    ) -> Result<(), CacheError> {
        self.write(CacheKey::FirstPage(author_id), articles).await
    }

    pub async fn delete_first_page(&self, author_id: i64) -> Result<(), CacheError> {
        self.remove(CacheKey::FirstPage(author_id)).await
    }

    pub async fn get_author_name(&self, author_id: i64) -> Result<Option<String>, CacheError> {
        self.read(CacheKey::AuthorName(author_id)).await
    }

    pub async fn set_author_name(&self, author_id: i64, name: &str) -> Result<(), CacheError> {
        self.write(CacheKey::AuthorName(author_id), name).await
    }

    async fn read<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Option<T>, CacheError> {
        let space = key.space();
        let Some(bytes) = self.store.get(&key.to_string()).await? else {
            counter!(METRIC_CACHE_MISS_TOTAL, "space" => space).increment(1);
            return Ok(None);
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT_TOTAL, "space" => space).increment(1);
                Ok(Some(value))
            }
            Err(err) => {
                debug!(key = %key, error = %err, "discarding undecodable cache entry");
                counter!(METRIC_CACHE_MISS_TOTAL, "space" => space).increment(1);
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: CacheKey, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(&key.to_string(), bytes, self.expiry).await
    }

    async fn remove(&self, key: CacheKey) -> Result<(), CacheError> {
        self.store.delete(&key.to_string()).await
    }
}
