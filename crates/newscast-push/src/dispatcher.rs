//! Batched push dispatch.

use std::ops::AddAssign;
use std::sync::Arc;

use newscast_core::config::MAX_BATCH_LIMIT;
use newscast_core::PushTarget;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PushError, PushResult};
use crate::gateway::{BatchResponse, PushGateway};
use crate::message::{MulticastMessage, NewsNotification, PushMessage};

/// Most targets sent in one multicast call.
pub const BATCH_LIMIT: usize = MAX_BATCH_LIMIT;

/// Aggregated delivery counts across batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub batches: usize,
}

impl AddAssign<BatchResponse> for DispatchResult {
    fn add_assign(&mut self, batch: BatchResponse) {
        self.success_count += batch.success_count;
        self.failure_count += batch.failure_count;
        self.batches += 1;
    }
}

/// Sends notifications through the gateway. Holds no per-call state.
pub struct PushDispatcher {
    gateway: Arc<dyn PushGateway>,
    batch_limit: usize,
}

impl PushDispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self::with_batch_limit(gateway, BATCH_LIMIT)
    }

    /// `batch_limit` is clamped to `1..=BATCH_LIMIT`.
    pub fn with_batch_limit(gateway: Arc<dyn PushGateway>, batch_limit: usize) -> Self {
        Self {
            gateway,
            batch_limit: batch_limit.clamp(1, BATCH_LIMIT),
        }
    }

    pub fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    /// Send to one device. Gateway failures come back as `Err`, never panic.
    pub async fn send_one(
        &self,
        target: &PushTarget,
        payload: &NewsNotification,
    ) -> PushResult<String> {
        if !target.has_token() {
            return Err(PushError::MissingToken(target.device_id.clone()));
        }

        let message = PushMessage::for_target(target, payload);
        match self.gateway.send(&message).await {
            Ok(message_id) => {
                debug!(device_id = %target.device_id, message_id = %message_id, "Push sent");
                Ok(message_id)
            }
            Err(e) => {
                warn!(
                    device_id = %target.device_id,
                    platform = %target.platform,
                    error = %e,
                    "Push send failed"
                );
                Err(e)
            }
        }
    }

    /// Send to many devices, one multicast call per batch of at most
    /// `batch_limit` targets, in order.
    ///
    /// A failing batch is counted as fully failed and the remaining batches
    /// are still sent.
    pub async fn send_many(
        &self,
        targets: &[PushTarget],
        payload: &NewsNotification,
    ) -> DispatchResult {
        let mut result = DispatchResult::default();
        if targets.is_empty() {
            return result;
        }

        let batch_count = targets.len().div_ceil(self.batch_limit);
        for (index, batch) in targets.chunks(self.batch_limit).enumerate() {
            let message = MulticastMessage::new(batch, payload);
            match self.gateway.send_multicast(&message).await {
                Ok(response) => {
                    if response.success_count == 0 {
                        warn!(
                            batch = index + 1,
                            batch_count,
                            size = batch.len(),
                            "Every send in batch failed"
                        );
                    } else {
                        debug!(
                            batch = index + 1,
                            batch_count,
                            success = response.success_count,
                            failure = response.failure_count,
                            "Batch sent"
                        );
                    }
                    result += response;
                }
                Err(e) => {
                    warn!(
                        batch = index + 1,
                        batch_count,
                        size = batch.len(),
                        error = %e,
                        "Batch send failed"
                    );
                    result += BatchResponse {
                        success_count: 0,
                        failure_count: batch.len(),
                    };
                }
            }
        }

        info!(
            news_id = payload.news_id,
            targets = targets.len(),
            success = result.success_count,
            failure = result.failure_count,
            batches = result.batches,
            "Push dispatch finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{target, targets, ScriptedGateway};
    use newscast_core::Platform;

    fn batch(success_count: usize, failure_count: usize) -> BatchResponse {
        BatchResponse {
            success_count,
            failure_count,
        }
    }

    fn payload() -> NewsNotification {
        NewsNotification {
            news_id: 5,
            title: "Parents evening".to_string(),
            body: "Thursday 18:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_small_list_is_one_call() {
        let gateway = Arc::new(ScriptedGateway::new());
        let dispatcher = PushDispatcher::new(gateway.clone());

        let result = dispatcher.send_many(&targets(500), &payload()).await;

        assert_eq!(gateway.batch_sizes(), vec![500]);
        assert_eq!(result.success_count, 500);
        assert_eq!(result.batches, 1);
    }

    #[tokio::test]
    async fn test_large_list_is_split_into_batches() {
        let gateway = Arc::new(ScriptedGateway::scripted(vec![
            Ok(batch(480, 20)),
            Ok(batch(497, 3)),
            Ok(batch(150, 50)),
        ]));
        let dispatcher = PushDispatcher::new(gateway.clone());

        let result = dispatcher.send_many(&targets(1200), &payload()).await;

        assert_eq!(gateway.batch_sizes(), vec![500, 500, 200]);
        assert_eq!(result.success_count, 480 + 497 + 150);
        assert_eq!(result.failure_count, 20 + 3 + 50);
        assert_eq!(result.batches, 3);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_rest() {
        let gateway = Arc::new(ScriptedGateway::scripted(vec![
            Ok(batch(500, 0)),
            Err(PushError::Gateway("quota exceeded".to_string())),
            Ok(batch(0, 500)),
            Ok(batch(210, 0)),
        ]));
        let dispatcher = PushDispatcher::new(gateway.clone());

        let result = dispatcher.send_many(&targets(1710), &payload()).await;

        assert_eq!(gateway.batch_sizes(), vec![500, 500, 500, 210]);
        assert_eq!(result.success_count, 500 + 210);
        assert_eq!(result.failure_count, 500 + 500);
        assert_eq!(result.batches, 4);
    }

    #[tokio::test]
    async fn test_empty_list_makes_no_call() {
        let gateway = Arc::new(ScriptedGateway::new());
        let dispatcher = PushDispatcher::new(gateway.clone());

        let result = dispatcher.send_many(&[], &payload()).await;

        assert_eq!(result, DispatchResult::default());
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_batch_limit_is_clamped() {
        let gateway = Arc::new(ScriptedGateway::new());
        let capped = PushDispatcher::with_batch_limit(gateway.clone(), 10_000);
        assert_eq!(capped.batch_limit(), 500);
        let raised = PushDispatcher::with_batch_limit(gateway.clone(), 0);
        assert_eq!(raised.batch_limit(), 1);

        let dispatcher = PushDispatcher::with_batch_limit(gateway.clone(), 2);
        dispatcher.send_many(&targets(5), &payload()).await;
        assert_eq!(gateway.batch_sizes(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_send_one_uses_target_platform() {
        let gateway = Arc::new(ScriptedGateway::new());
        let dispatcher = PushDispatcher::new(gateway.clone());

        let id = dispatcher
            .send_one(&target("droid", Platform::Android), &payload())
            .await
            .unwrap();

        assert!(id.starts_with("projects/test/messages/"));
        let sent = gateway.single_sends();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token.as_deref(), Some("droid"));
        assert!(sent[0].android.is_some());
        assert!(sent[0].apns.is_none());
    }

    #[tokio::test]
    async fn test_send_one_failure_is_returned() {
        let gateway = Arc::new(ScriptedGateway::failing_single());
        let dispatcher = PushDispatcher::new(gateway.clone());

        let result = dispatcher
            .send_one(&target("gone", Platform::Ios), &payload())
            .await;
        assert!(matches!(result, Err(PushError::Rejected { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_send_one_without_token_skips_gateway() {
        let gateway = Arc::new(ScriptedGateway::new());
        let dispatcher = PushDispatcher::new(gateway.clone());

        let result = dispatcher.send_one(&target("", Platform::Ios), &payload()).await;
        assert!(matches!(result, Err(PushError::MissingToken(_))));
        assert_eq!(gateway.calls(), 0);
    }
}
