//! Stub gateway and target source shared by the unit tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use newscast_core::{NewscastError, NewscastResult, Platform, PushTarget, PushTargetSource};
use parking_lot::Mutex;

use crate::error::{PushError, PushResult};
use crate::gateway::{BatchResponse, PushGateway};
use crate::message::{MulticastMessage, PushMessage};

pub fn target(token: &str, platform: Platform) -> PushTarget {
    PushTarget {
        device_id: format!("device-{}", token),
        token: token.to_string(),
        platform,
        updated_at: Utc::now(),
    }
}

pub fn targets(count: usize) -> Vec<PushTarget> {
    (0..count)
        .map(|i| {
            let platform = if i % 2 == 0 { Platform::Ios } else { Platform::Android };
            target(&format!("token-{}", i), platform)
        })
        .collect()
}

/// Gateway that records calls and answers multicasts from a script.
///
/// Without a scripted answer, a multicast succeeds for every token.
#[derive(Default)]
pub struct ScriptedGateway {
    batches: Mutex<Vec<usize>>,
    singles: Mutex<Vec<PushMessage>>,
    script: Mutex<VecDeque<PushResult<BatchResponse>>>,
    fail_single: bool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(answers: Vec<PushResult<BatchResponse>>) -> Self {
        Self {
            script: Mutex::new(answers.into()),
            ..Self::default()
        }
    }

    pub fn failing_single() -> Self {
        Self {
            fail_single: true,
            ..Self::default()
        }
    }

    /// Token count of each multicast call, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().clone()
    }

    pub fn single_sends(&self) -> Vec<PushMessage> {
        self.singles.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().len() + self.singles.lock().len()
    }
}

#[async_trait]
impl PushGateway for ScriptedGateway {
    async fn send(&self, message: &PushMessage) -> PushResult<String> {
        self.singles.lock().push(message.clone());
        if self.fail_single {
            return Err(PushError::Rejected {
                status: 404,
                body: "UNREGISTERED".to_string(),
            });
        }
        Ok(format!("projects/test/messages/{}", self.singles.lock().len()))
    }

    async fn send_multicast(&self, message: &MulticastMessage) -> PushResult<BatchResponse> {
        self.batches.lock().push(message.tokens.len());
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or(Ok(BatchResponse {
            success_count: message.tokens.len(),
            failure_count: 0,
        }))
    }
}

/// Fixed list of push targets.
#[derive(Default)]
pub struct StaticTargets {
    targets: Vec<PushTarget>,
    failing: bool,
}

impl StaticTargets {
    pub fn new(targets: Vec<PushTarget>) -> Self {
        Self {
            targets,
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            targets: Vec::new(),
            failing: true,
        }
    }
}

#[async_trait]
impl PushTargetSource for StaticTargets {
    async fn fetch_active_push_targets(
        &self,
        _window: chrono::Duration,
    ) -> NewscastResult<Vec<PushTarget>> {
        if self.failing {
            return Err(NewscastError::source(std::io::Error::other("timeout")));
        }
        Ok(self.targets.clone())
    }

    async fn find_push_target(&self, device_id: &str) -> NewscastResult<Option<PushTarget>> {
        Ok(self.targets.iter().find(|t| t.device_id == device_id).cloned())
    }

    async fn upsert_push_target(
        &self,
        device_id: &str,
        token: &str,
        platform: Platform,
    ) -> NewscastResult<PushTarget> {
        Ok(PushTarget {
            device_id: device_id.to_string(),
            token: token.to_string(),
            platform,
            updated_at: Utc::now(),
        })
    }
}
