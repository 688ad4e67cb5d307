//! Author directory with a name cache in front of it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::application::background::BackgroundTasks;
use crate::application::repos::{AuthorDirectory, RepoError};
use crate::cache::ArticleCache;

#[derive(Clone)]
pub struct CachedAuthorDirectory {
    inner: Arc<dyn AuthorDirectory>,
    cache: ArticleCache,
    tasks: BackgroundTasks,
}

impl CachedAuthorDirectory {
    pub fn new(inner: Arc<dyn AuthorDirectory>, cache: ArticleCache, tasks: BackgroundTasks) -> Self {
        Self {
            inner,
            cache,
            tasks,
        }
    }
}

#[async_trait]
impl AuthorDirectory for CachedAuthorDirectory {
    async fn find_name(&self, author_id: i64) -> Result<String, RepoError> {
        match self.cache.get_author_name(author_id).await {
            Ok(Some(name)) => return Ok(name),
            Ok(None) => {}
            Err(err) => warn!(author_id, error = %err, "author name cache unavailable"),
        }

        let name = self.inner.find_name(author_id).await?;
        let cache = self.cache.clone();
        let cached = name.clone();
        self.tasks.submit("cache_author_name", async move {
            cache.set_author_name(author_id, &cached).await?;
            Ok(())
        });
        Ok(name)
    }
}
