//! Push gateway interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PushResult;
use crate::message::{MulticastMessage, PushMessage};

/// Delivery counts reported for one multicast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
}

/// External service that delivers notifications to device tokens.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Send to the single token carried by `message`. Returns the gateway's
    /// message id.
    async fn send(&self, message: &PushMessage) -> PushResult<String>;

    /// Send the same message to every token in `message.tokens`.
    async fn send_multicast(&self, message: &MulticastMessage) -> PushResult<BatchResponse>;
}
