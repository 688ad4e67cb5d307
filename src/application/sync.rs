//! Draft writes and the draft-to-published sync protocol.
//!
//! Every write here runs in one storage transaction. A sync writes the draft and
//! upserts its published projection in the same transaction, so readers see both
//! or neither. Ownership is enforced by filtering on `(id, author_id)`: a filter
//! that matches nothing aborts with [`RepoError::IncorrectAuthor`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::repos::{ArticleStore, ArticleWriteTx, RepoError};
use crate::domain::entities::{ArticleDraft, ArticleRecord, PublishedArticleRecord};
use crate::domain::types::ArticleStatus;
use crate::util::clock::now_millis;

#[derive(Clone)]
pub struct ArticleSync {
    store: Arc<dyn ArticleStore>,
}

impl ArticleSync {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Insert a new draft. The id on `draft` is ignored; storage generates one.
    pub async fn insert(&self, draft: &ArticleDraft) -> Result<ArticleRecord, RepoError> {
        let mut tx = self.store.begin().await?;
        let record = tx.insert_article(draft, now_millis()).await?;
        tx.commit().await?;

        debug!(article_id = record.id, author_id = record.author_id, "draft created");
        Ok(record)
    }

    /// Update an existing draft owned by `draft.author_id`.
    pub async fn update(&self, draft: &ArticleDraft) -> Result<ArticleRecord, RepoError> {
        let mut tx = self.store.begin().await?;
        let record = update_owned(tx.as_mut(), draft, now_millis()).await?;
        tx.commit().await?;

        debug!(article_id = record.id, author_id = record.author_id, "draft updated");
        Ok(record)
    }

    /// Write the draft and upsert its published projection atomically.
    ///
    /// Returns the published row as stored.
    pub async fn sync(&self, draft: &ArticleDraft) -> Result<PublishedArticleRecord, RepoError> {
        let now = now_millis();
        let mut tx = self.store.begin().await?;

        let record = if draft.is_new() {
            tx.insert_article(draft, now).await?
        } else {
            update_owned(tx.as_mut(), draft, now).await?
        };
        let published = tx
            .upsert_published(&PublishedArticleRecord::project(&record, now))
            .await?;
        tx.commit().await?;

        info!(
            article_id = published.id,
            author_id = published.author_id,
            status = %published.status,
            "article synced"
        );
        Ok(published)
    }

    /// Set `status` on both the draft and the published row atomically.
    pub async fn sync_status(
        &self,
        author_id: i64,
        id: i64,
        status: ArticleStatus,
    ) -> Result<i64, RepoError> {
        let now = now_millis();
        let mut tx = self.store.begin().await?;

        if tx
            .update_article_status(author_id, id, status, now)
            .await?
            == 0
        {
            return Err(RepoError::IncorrectAuthor { id, author_id });
        }
        if tx
            .update_published_status(author_id, id, status, now)
            .await?
            == 0
        {
            return Err(RepoError::IncorrectAuthor { id, author_id });
        }
        tx.commit().await?;

        info!(article_id = id, author_id, status = %status, "article status synced");
        Ok(id)
    }
}

async fn update_owned(
    tx: &mut dyn ArticleWriteTx,
    draft: &ArticleDraft,
    now: i64,
) -> Result<ArticleRecord, RepoError> {
    tx.update_article(draft, now)
        .await?
        .ok_or(RepoError::IncorrectAuthor {
            id: draft.id,
            author_id: draft.author_id,
        })
}
