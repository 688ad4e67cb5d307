mod read;
mod types;
mod write;

pub(crate) use write::PgArticleTx;
