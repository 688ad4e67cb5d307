//! Application layer: persistence contracts, sync protocol and cache orchestration.

pub mod articles;
pub mod authors;
pub mod background;
pub mod error;
pub mod repos;
pub mod service;
pub mod sync;
