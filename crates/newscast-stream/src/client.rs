//! A single streaming connection and its write side.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{StreamError, StreamResult};
use crate::frame::heartbeat_frame;

/// Write half of a streaming connection.
#[async_trait]
pub trait FrameSink: Send {
    async fn write_frame(&mut self, frame: Bytes) -> StreamResult<()>;

    /// Close the connection. Later writes fail with `Disconnected`.
    async fn close(&mut self);
}

/// Sink feeding a bounded channel whose receiver drives an HTTP response body.
///
/// A dropped receiver means the peer went away.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl ChannelSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: Bytes) -> StreamResult<()> {
        let tx = self.tx.as_ref().ok_or(StreamError::Disconnected)?;
        tx.send(frame).await.map_err(|_| StreamError::Disconnected)
    }

    async fn close(&mut self) {
        self.tx.take();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a streaming client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Active,
    /// A write failed or timed out.
    Dead,
    /// The peer disconnected.
    Closed,
    /// Server shutdown is closing the connection.
    Draining,
    Removed,
}

impl ClientState {
    /// Check if transition to another state is valid.
    pub fn can_transition_to(&self, target: &ClientState) -> bool {
        use ClientState::*;
        matches!(
            (self, target),
            (Connecting, Active)
                | (Connecting | Active, Dead | Closed | Draining)
                | (Dead | Closed | Draining, Removed)
        )
    }

    /// Frames may still be written in this state.
    pub fn accepts_writes(&self) -> bool {
        matches!(self, Self::Connecting | Self::Active)
    }
}

pub(crate) struct ClientWriter {
    sink: Box<dyn FrameSink>,
    last_event_id: Option<u64>,
}

impl ClientWriter {
    async fn write(&mut self, frame: Bytes, timeout: Duration) -> StreamResult<()> {
        tokio::time::timeout(timeout, self.sink.write_frame(frame))
            .await
            .map_err(|_| StreamError::WriteTimeout(timeout))?
    }

    /// Write an event unless this connection already saw it or a later one.
    ///
    /// Returns whether a frame was written.
    pub(crate) async fn write_event(
        &mut self,
        event_id: u64,
        frame: Bytes,
        timeout: Duration,
    ) -> StreamResult<bool> {
        if self.last_event_id.is_some_and(|last| event_id <= last) {
            return Ok(false);
        }
        self.write(frame, timeout).await?;
        self.last_event_id = Some(event_id);
        Ok(true)
    }
}

/// One persistent event-stream connection.
///
/// Broadcast and heartbeat writes go through the same async mutex so two
/// frames never interleave on the wire.
pub struct StreamClient {
    id: ClientId,
    created_at: DateTime<Utc>,
    state: Mutex<ClientState>,
    writer: AsyncMutex<ClientWriter>,
    heartbeat: CancellationToken,
    write_timeout: Duration,
}

impl StreamClient {
    pub fn new(
        sink: Box<dyn FrameSink>,
        heartbeat: CancellationToken,
        write_timeout: Duration,
    ) -> Self {
        Self {
            id: ClientId::new(),
            created_at: Utc::now(),
            state: Mutex::new(ClientState::Connecting),
            writer: AsyncMutex::new(ClientWriter {
                sink,
                last_event_id: None,
            }),
            heartbeat,
            write_timeout,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> ClientState {
        *self.state.lock()
    }

    pub fn is_alive(&self) -> bool {
        self.state().accepts_writes()
    }

    /// Move to `target` if the lifecycle allows it.
    pub fn transition(&self, target: ClientState) -> bool {
        let mut state = self.state.lock();
        if state.can_transition_to(&target) {
            *state = target;
            true
        } else {
            false
        }
    }

    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    pub(crate) fn heartbeat_token(&self) -> &CancellationToken {
        &self.heartbeat
    }

    pub(crate) fn cancel_heartbeat(&self) {
        self.heartbeat.cancel();
    }

    pub(crate) async fn writer(&self) -> MutexGuard<'_, ClientWriter> {
        self.writer.lock().await
    }

    /// Send one event frame. Returns `Ok(false)` when the frame was skipped
    /// because the client is no longer writable or already has this event.
    pub async fn send_event(&self, event_id: u64, frame: Bytes) -> StreamResult<bool> {
        let mut writer = self.writer().await;
        if !self.is_alive() {
            return Ok(false);
        }
        writer.write_event(event_id, frame, self.write_timeout).await
    }

    pub async fn send_heartbeat(&self) -> StreamResult<()> {
        let mut writer = self.writer().await;
        if !self.is_alive() {
            return Err(StreamError::Disconnected);
        }
        writer.write(heartbeat_frame(), self.write_timeout).await
    }

    /// Close the underlying connection, waiting for any in-flight write.
    pub async fn close(&self) {
        let mut writer = self.writer().await;
        writer.sink.close().await;
    }
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, StallingSink};

    fn client(sink: impl FrameSink + 'static) -> StreamClient {
        StreamClient::new(Box::new(sink), CancellationToken::new(), Duration::from_secs(1))
    }

    #[test]
    fn test_state_transitions() {
        use ClientState::*;
        assert!(Connecting.can_transition_to(&Active));
        assert!(Active.can_transition_to(&Dead));
        assert!(Active.can_transition_to(&Closed));
        assert!(Connecting.can_transition_to(&Draining));
        assert!(Dead.can_transition_to(&Removed));
        assert!(!Active.can_transition_to(&Connecting));
        assert!(!Active.can_transition_to(&Removed));
        assert!(!Removed.can_transition_to(&Active));
        assert!(!Dead.can_transition_to(&Closed));
    }

    #[tokio::test]
    async fn test_send_event_skips_stale_ids() {
        let sink = RecordingSink::new();
        let client = client(sink.clone());

        assert!(client.send_event(4, Bytes::from_static(b"id: 4\n\n")).await.unwrap());
        assert!(!client.send_event(4, Bytes::from_static(b"id: 4\n\n")).await.unwrap());
        assert!(!client.send_event(3, Bytes::from_static(b"id: 3\n\n")).await.unwrap());
        assert!(client.send_event(5, Bytes::from_static(b"id: 5\n\n")).await.unwrap());

        assert_eq!(sink.event_ids(), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_no_writes_after_close_state() {
        let sink = RecordingSink::new();
        let client = client(sink.clone());
        assert!(client.transition(ClientState::Closed));

        assert!(!client.send_event(1, Bytes::from_static(b"id: 1\n\n")).await.unwrap());
        assert!(client.send_heartbeat().await.is_err());
        assert!(sink.frames().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_times_out() {
        let client = client(StallingSink);
        let err = client.send_heartbeat().await.unwrap_err();
        assert!(matches!(err, StreamError::WriteTimeout(_)));
    }

    #[tokio::test]
    async fn test_channel_sink_reports_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::channel(4);
        sink.write_frame(Bytes::from_static(b": ping\n\n")).await.unwrap();
        drop(rx);
        assert!(matches!(
            sink.write_frame(Bytes::from_static(b": ping\n\n")).await,
            Err(StreamError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_channel_sink_close_ends_stream() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        sink.write_frame(Bytes::from_static(b"a")).await.unwrap();
        sink.close().await;
        assert_eq!(rx.recv().await.as_deref(), Some(&b"a"[..]));
        assert!(rx.recv().await.is_none());
        assert!(sink.write_frame(Bytes::from_static(b"b")).await.is_err());
    }
}
