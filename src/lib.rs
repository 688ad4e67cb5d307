//! Article drafting and publishing core.
//!
//! Drafts and their published projections live in two relational tables kept in
//! step by [`application::sync::ArticleSync`]; reads go through
//! [`application::articles::ArticleRepository`], which puts a best-effort cache in
//! front of storage.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
