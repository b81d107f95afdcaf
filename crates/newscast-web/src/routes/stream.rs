//! Event-stream subscription endpoint.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use newscast_stream::{ChannelSink, ClientId, StreamBroadcaster, StreamError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Removes the client from the broadcaster when the response body is dropped,
/// which is how a peer disconnect surfaces.
struct DisconnectGuard {
    broadcaster: Arc<StreamBroadcaster>,
    client_id: ClientId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if self.broadcaster.disconnect(&self.client_id) {
            debug!(client_id = %self.client_id, "Stream body dropped");
        }
    }
}

/// Response body for one subscriber.
struct ClientStream {
    frames: ReceiverStream<Bytes>,
    _guard: DisconnectGuard,
}

impl Stream for ClientStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames.poll_next_unpin(cx).map(|frame| frame.map(Ok))
    }
}

/// Open a long-lived event stream of news-list updates.
pub async fn subscribe(State(state): State<AppState>) -> Result<Response, (StatusCode, String)> {
    let (sink, rx) = ChannelSink::channel(state.client_buffer);

    let client_id = state
        .broadcaster
        .subscribe(Box::new(sink))
        .await
        .map_err(|e| match e {
            StreamError::ShuttingDown => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    let body = Body::from_stream(ClientStream {
        frames: ReceiverStream::new(rx),
        _guard: DisconnectGuard {
            broadcaster: state.broadcaster.clone(),
            client_id,
        },
    });

    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        body,
    )
        .into_response())
}
