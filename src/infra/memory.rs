//! Process-local relational store with transactional writes.
//!
//! A transaction holds the table lock for its whole lifetime and works on a copy
//! of the tables; commit swaps the copy in, drop discards it. Concurrent writers
//! are therefore serialized, which is stricter than the row-level locking a real
//! database gives but preserves the same atomicity guarantees.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::repos::{ArticleStore, ArticleWriteTx, AuthorDirectory, RepoError};
use crate::domain::entities::{ArticleDraft, ArticleRecord, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;
use crate::util::clock::next_update;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    articles: BTreeMap<i64, ArticleRecord>,
    published: BTreeMap<i64, PublishedArticleRecord>,
    authors: HashMap<i64, String>,
}

#[derive(Clone, Default)]
pub struct InMemoryArticleStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_author(&self, id: i64, name: impl Into<String>) {
        self.tables.lock().await.authors.insert(id, name.into());
    }

    pub async fn article_count(&self) -> usize {
        self.tables.lock().await.articles.len()
    }

    pub async fn published_count(&self) -> usize {
        self.tables.lock().await.published.len()
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn begin(&self) -> Result<Box<dyn ArticleWriteTx>, RepoError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        Ok(self.tables.lock().await.articles.get(&id).cloned())
    }

    async fn find_published(&self, id: i64) -> Result<Option<PublishedArticleRecord>, RepoError> {
        Ok(self.tables.lock().await.published.get(&id).cloned())
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<ArticleRecord>, RepoError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<ArticleRecord> = tables
            .articles
            .values()
            .filter(|row| row.author_id == author_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl AuthorDirectory for InMemoryArticleStore {
    async fn find_name(&self, author_id: i64) -> Result<String, RepoError> {
        self.tables
            .lock()
            .await
            .authors
            .get(&author_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl ArticleWriteTx for MemoryTx {
    async fn insert_article(
        &mut self,
        draft: &ArticleDraft,
        now: i64,
    ) -> Result<ArticleRecord, RepoError> {
        self.working.next_id += 1;
        let id = self.working.next_id;
        let record = ArticleRecord {
            id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            author_id: draft.author_id,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        self.working.articles.insert(id, record.clone());
        Ok(record)
    }

    async fn update_article(
        &mut self,
        draft: &ArticleDraft,
        now: i64,
    ) -> Result<Option<ArticleRecord>, RepoError> {
        let Some(row) = self
            .working
            .articles
            .get_mut(&draft.id)
            .filter(|row| row.author_id == draft.author_id)
        else {
            return Ok(None);
        };
        row.title = draft.title.clone();
        row.content = draft.content.clone();
        row.status = draft.status;
        row.updated_at = next_update(row.updated_at, now);
        Ok(Some(row.clone()))
    }

    async fn upsert_published(
        &mut self,
        record: &PublishedArticleRecord,
    ) -> Result<PublishedArticleRecord, RepoError> {
        let stored = self
            .working
            .published
            .entry(record.id)
            .and_modify(|row| {
                row.title = record.title.clone();
                row.content = record.content.clone();
                row.status = record.status;
                row.updated_at = next_update(row.updated_at, record.updated_at);
            })
            .or_insert_with(|| record.clone());
        Ok(stored.clone())
    }

    async fn update_article_status(
        &mut self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
        now: i64,
    ) -> Result<u64, RepoError> {
        match self
            .working
            .articles
            .get_mut(&id)
            .filter(|row| row.author_id == author_id)
        {
            Some(row) => {
                row.status = status;
                row.updated_at = next_update(row.updated_at, now);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_published_status(
        &mut self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
        now: i64,
    ) -> Result<u64, RepoError> {
        match self
            .working
            .published
            .get_mut(&id)
            .filter(|row| row.author_id == author_id)
        {
            Some(row) => {
                row.status = status;
                row.updated_at = next_update(row.updated_at, now);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, author_id: i64) -> ArticleDraft {
        ArticleDraft {
            id: 0,
            title: title.into(),
            content: String::new(),
            author_id,
            status: ArticleStatus::Unpublished,
        }
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryArticleStore::new();
        {
            let mut tx = store.begin().await.expect("begin");
            tx.insert_article(&draft("lost", 1), 10).await.expect("insert");
        }
        assert_eq!(store.article_count().await, 0);

        let mut tx = store.begin().await.expect("begin");
        let kept = tx.insert_article(&draft("kept", 1), 20).await.expect("insert");
        tx.commit().await.expect("commit");
        assert_eq!(store.find_article(kept.id).await.expect("read"), Some(kept));
    }

    #[tokio::test]
    async fn list_is_scoped_and_ordered_by_update_time() {
        let store = InMemoryArticleStore::new();
        let mut tx = store.begin().await.expect("begin");
        let old = tx.insert_article(&draft("old", 1), 10).await.expect("insert");
        let new = tx.insert_article(&draft("new", 1), 30).await.expect("insert");
        tx.insert_article(&draft("other", 2), 20).await.expect("insert");
        tx.commit().await.expect("commit");

        let rows = store.list_by_author(1, 0, 10).await.expect("list");
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);

        let page = store.list_by_author(1, 1, 10).await.expect("list");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, old.id);
    }

    #[tokio::test]
    async fn upsert_keeps_original_creation_time() {
        let store = InMemoryArticleStore::new();
        let record = PublishedArticleRecord {
            id: 5,
            title: "a".into(),
            content: "b".into(),
            author_id: 1,
            status: ArticleStatus::Published,
            created_at: 100,
            updated_at: 100,
        };
        let mut tx = store.begin().await.expect("begin");
        tx.upsert_published(&record).await.expect("insert");
        let stored = tx
            .upsert_published(&PublishedArticleRecord {
                title: "c".into(),
                created_at: 200,
                updated_at: 200,
                ..record.clone()
            })
            .await
            .expect("update");
        tx.commit().await.expect("commit");

        assert_eq!(stored.title, "c");
        assert_eq!(stored.created_at, 100);
        assert_eq!(stored.updated_at, 200);
    }

    #[tokio::test]
    async fn unknown_author_is_not_found() {
        let store = InMemoryArticleStore::new();
        store.insert_author(1, "ada").await;
        assert_eq!(store.find_name(1).await.expect("known"), "ada");
        assert!(matches!(store.find_name(2).await, Err(RepoError::NotFound)));
    }
}
