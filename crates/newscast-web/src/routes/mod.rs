//! Route handlers.

pub mod devices;
pub mod health;
pub mod internal;
pub mod news;
pub mod stream;
