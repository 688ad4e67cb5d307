//! Cache key definitions.
//!
//! Every cached value lives under one of these keys. Article keys are id-scoped,
//! listing keys are author-scoped.

use std::fmt;

/// Logical key spaces held by the cache store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Single draft article, by article id.
    Article(i64),
    /// Single published article enriched with the author name, by article id.
    PublishedArticle(i64),
    /// First listing page of one author, by author id.
    FirstPage(i64),
    /// Author display name, by author id.
    AuthorName(i64),
}

impl CacheKey {
    /// Short label used in logs and metrics.
    pub fn space(&self) -> &'static str {
        match self {
            CacheKey::Article(_) => "article",
            CacheKey::PublishedArticle(_) => "published",
            CacheKey::FirstPage(_) => "first_page",
            CacheKey::AuthorName(_) => "author",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Article(id) => write!(f, "article:{id}"),
            CacheKey::PublishedArticle(id) => write!(f, "article:pub:{id}"),
            CacheKey::FirstPage(author_id) => write!(f, "article:first_page:{author_id}"),
            CacheKey::AuthorName(author_id) => write!(f, "user:info:{author_id}"),
        }
    }
}
