//! Stub sinks and news sources shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use newscast_core::{NewsItem, NewsSnapshot, NewsSource, NewscastError, NewscastResult};
use parking_lot::Mutex;

use crate::client::FrameSink;
use crate::error::{StreamError, StreamResult};

/// Records every frame; optionally fails once `fail_after` frames were written.
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<Bytes>>>,
    closed: Arc<AtomicBool>,
    fail_after: Option<usize>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().clone()
    }

    /// Write attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Ids of the event frames received, in order.
    pub fn event_ids(&self) -> Vec<u64> {
        self.frames()
            .iter()
            .filter_map(|frame| {
                let text = std::str::from_utf8(frame).ok()?;
                text.lines()
                    .find_map(|line| line.strip_prefix("id: "))
                    .and_then(|id| id.parse().ok())
            })
            .collect()
    }

    /// JSON payloads of the event frames received, in order.
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.frames()
            .iter()
            .filter_map(|frame| {
                let text = std::str::from_utf8(frame).ok()?;
                let data = text.lines().find_map(|line| line.strip_prefix("data: "))?;
                serde_json::from_str(data).ok()
            })
            .collect()
    }

    pub fn heartbeats(&self) -> usize {
        self.frames().iter().filter(|frame| frame.starts_with(b":")).count()
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn write_frame(&mut self, frame: Bytes) -> StreamResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(StreamError::Disconnected);
        }
        let mut frames = self.frames.lock();
        if self.fail_after.is_some_and(|limit| frames.len() >= limit) {
            return Err(StreamError::Disconnected);
        }
        frames.push(frame);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Takes a while to write each frame and fails any write that starts while
/// another is still in progress.
#[derive(Clone, Default)]
pub struct SlowSink {
    frames: Arc<Mutex<Vec<Bytes>>>,
    in_flight: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
}

impl SlowSink {
    pub const WRITE_TIME: Duration = Duration::from_millis(50);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().clone()
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSink for SlowSink {
    async fn write_frame(&mut self, frame: Bytes) -> StreamResult<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
            return Err(StreamError::Disconnected);
        }
        tokio::time::sleep(Self::WRITE_TIME).await;
        self.frames.lock().push(frame);
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {}
}

/// A connection whose writes never complete.
pub struct StallingSink;

#[async_trait]
impl FrameSink for StallingSink {
    async fn write_frame(&mut self, _frame: Bytes) -> StreamResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn close(&mut self) {}
}

/// News source whose next answer is set by the test.
#[derive(Default)]
pub struct ScriptedSource {
    snapshot: Mutex<NewsSnapshot>,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(snapshot: NewsSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        })
    }

    pub fn set(&self, snapshot: NewsSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSource for ScriptedSource {
    async fn fetch_all_news(&self) -> NewscastResult<NewsSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NewscastError::source(std::io::Error::other("connection refused")));
        }
        Ok(self.snapshot.lock().clone())
    }

    async fn get_news(&self, id: i64) -> NewscastResult<Option<NewsItem>> {
        Ok(self.snapshot.lock().items().iter().find(|n| n.id == id).cloned())
    }

    async fn create_news(&self, _title: &str, _content: &str) -> NewscastResult<NewsItem> {
        Err(NewscastError::validation("scripted source is read-only"))
    }
}

pub fn news(id: i64, title: &str) -> NewsItem {
    NewsItem {
        id,
        title: title.to_string(),
        content: format!("{} details", title),
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
    }
}

pub fn snapshot(titles: &[&str]) -> NewsSnapshot {
    NewsSnapshot::new(
        titles
            .iter()
            .enumerate()
            .map(|(i, title)| news(i as i64 + 1, title))
            .collect(),
    )
}
