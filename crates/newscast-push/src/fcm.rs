//! Firebase Cloud Messaging (HTTP v1) gateway.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use newscast_core::config::PushConfig;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{PushError, PushResult};
use crate::gateway::{BatchResponse, PushGateway};
use crate::message::{MulticastMessage, PushMessage};

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

/// Where the OAuth2 bearer comes from.
#[derive(Clone, Debug)]
enum AccessToken {
    Static(String),
    /// Re-read on every send so an external refresher can rotate it.
    File(PathBuf),
}

impl AccessToken {
    fn kind(&self) -> &'static str {
        match self {
            AccessToken::Static(_) => "static",
            AccessToken::File(_) => "file",
        }
    }

    async fn current(&self) -> PushResult<String> {
        match self {
            AccessToken::Static(token) => Ok(token.clone()),
            AccessToken::File(path) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    PushError::Config(format!(
                        "cannot read access token file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(raw.trim().to_string())
            }
        }
    }
}

/// Sends messages through the FCM v1 `messages:send` endpoint.
///
/// The v1 API takes one token per request, so a multicast fans out as
/// concurrent single sends, at most `concurrency` in flight.
///
/// FCM access tokens expire after about an hour. With
/// `push.access_token_file` set the bearer is read from that file before
/// each send (once per multicast); otherwise the static `push.access_token`
/// is used and must be rotated by restarting with a fresh
/// `NEWSCAST_PUSH_ACCESS_TOKEN`.
#[derive(Clone)]
pub struct FcmGateway {
    client: reqwest::Client,
    send_url: String,
    access_token: AccessToken,
    concurrency: usize,
}

impl FcmGateway {
    pub fn new(config: &PushConfig) -> PushResult<Self> {
        if config.project_id.trim().is_empty() {
            return Err(PushError::Config("push.project_id is not set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let send_url = format!(
            "{}/projects/{}/messages:send",
            config.endpoint.trim_end_matches('/'),
            config.project_id
        );
        let access_token = match &config.access_token_file {
            Some(path) => AccessToken::File(path.clone()),
            None => AccessToken::Static(config.access_token.clone()),
        };
        info!(
            url = %send_url,
            token_source = access_token.kind(),
            "FCM gateway initialized"
        );

        Ok(Self {
            client,
            send_url,
            access_token,
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }

    async fn send_with(&self, message: &PushMessage, bearer: &str) -> PushResult<String> {
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(bearer)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.name)
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, message: &PushMessage) -> PushResult<String> {
        let bearer = self.access_token.current().await?;
        self.send_with(message, &bearer).await
    }

    async fn send_multicast(&self, message: &MulticastMessage) -> PushResult<BatchResponse> {
        let singles: Vec<PushMessage> = message
            .tokens
            .iter()
            .map(|token| message.message.with_token(token))
            .collect();

        let bearer = self.access_token.current().await?;
        let bearer = bearer.as_str();

        let results: Vec<PushResult<String>> = stream::iter(singles)
            .map(|single| async move { self.send_with(&single, bearer).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut response = BatchResponse::default();
        for result in results {
            match result {
                Ok(_) => response.success_count += 1,
                Err(e) => {
                    debug!(error = %e, "Multicast send to one token failed");
                    response.failure_count += 1;
                }
            }
        }
        Ok(response)
    }
}
