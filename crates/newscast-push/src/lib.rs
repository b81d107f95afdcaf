//! Newscast push delivery.
//!
//! Builds platform-specific notifications for news items and sends them to
//! mobile devices through a push gateway, in batches the gateway accepts.

pub mod dispatcher;
pub mod error;
pub mod fcm;
pub mod gateway;
pub mod message;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::{DispatchResult, PushDispatcher, BATCH_LIMIT};
pub use error::{PushError, PushResult};
pub use fcm::FcmGateway;
pub use gateway::{BatchResponse, PushGateway};
pub use message::{MulticastMessage, NewsNotification, PushMessage};
pub use orchestrator::{DispatchHandle, NotificationOrchestrator};
