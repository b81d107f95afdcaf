//! Newscast Core Library
//!
//! Domain models, configuration and collaborator interfaces shared by the
//! streaming and push delivery paths.

pub mod auth;
pub mod config;
pub mod error;
pub mod model;
pub mod source;

pub use auth::{IdentityValidator, StaticTokenValidator};
pub use config::Config;
pub use error::{NewscastError, NewscastResult};
pub use model::{NewsItem, NewsSnapshot, Platform, PushTarget};
pub use source::{NewsSource, PushTargetSource};
