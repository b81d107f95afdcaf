//! Newscast Redis Data Layer
//!
//! Redis-backed news list and push-target registry.

pub mod client;
pub mod queries;
pub mod store;

pub use client::{Keys, RedisError, RedisPool, RedisResult, init_pool};
pub use queries::devices;
pub use queries::news;
pub use store::RedisStore;
