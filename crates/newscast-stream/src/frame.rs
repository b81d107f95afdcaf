//! Event-stream wire frames.
//!
//! An event frame is three lines (`id`, `event`, `data`) followed by a blank
//! line. A heartbeat is a single comment line.

use std::sync::Arc;

use bytes::Bytes;
use newscast_core::NewsSnapshot;

use crate::error::StreamResult;

/// Event type tag carried by every news frame.
pub const EVENT_KIND: &str = "news-list";

const HEARTBEAT: &[u8] = b": keep-alive\n\n";

/// A numbered news-list event with its frame pre-encoded.
///
/// The frame is serialized once when the event is built; fan-out clones the
/// `Bytes` handle only.
#[derive(Debug, Clone)]
pub struct Event {
    id: u64,
    snapshot: Arc<NewsSnapshot>,
    frame: Bytes,
}

impl Event {
    pub fn new(id: u64, snapshot: NewsSnapshot) -> StreamResult<Self> {
        let data = serde_json::to_string(&snapshot)?;
        Ok(Self {
            id,
            snapshot: Arc::new(snapshot),
            frame: encode_event(id, EVENT_KIND, &data),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        EVENT_KIND
    }

    pub fn snapshot(&self) -> &NewsSnapshot {
        &self.snapshot
    }

    pub fn frame(&self) -> Bytes {
        self.frame.clone()
    }
}

/// Encode one event frame. `data` must not contain line breaks; compact JSON
/// never does.
pub fn encode_event(id: u64, kind: &str, data: &str) -> Bytes {
    Bytes::from(format!("id: {}\nevent: {}\ndata: {}\n\n", id, kind, data))
}

pub fn heartbeat_frame() -> Bytes {
    Bytes::from_static(HEARTBEAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use newscast_core::NewsItem;

    #[test]
    fn test_event_frame_layout() {
        let snapshot = NewsSnapshot::new(vec![NewsItem {
            id: 3,
            title: "Timetable\nupdate".to_string(),
            content: "Room 4 moved".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
        }]);
        let event = Event::new(42, snapshot).unwrap();

        let text = String::from_utf8(event.frame().to_vec()).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[0], "id: 42");
        assert_eq!(lines[1], "event: news-list");
        assert!(lines[2].starts_with("data: [{"));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "");
        assert_eq!(lines.len(), 5);

        let data: serde_json::Value = serde_json::from_str(&lines[2]["data: ".len()..]).unwrap();
        assert_eq!(data[0]["title"], "Timetable\nupdate");
    }

    #[test]
    fn test_empty_snapshot_frame() {
        let event = Event::new(0, NewsSnapshot::default()).unwrap();
        assert_eq!(&event.frame()[..], b"id: 0\nevent: news-list\ndata: []\n\n");
        assert_eq!(event.kind(), "news-list");
    }

    #[test]
    fn test_heartbeat_has_no_fields() {
        let text = String::from_utf8(heartbeat_frame().to_vec()).unwrap();
        assert!(text.starts_with(':'));
        assert!(!text.contains("id:"));
        assert!(!text.contains("data:"));
        assert!(text.ends_with("\n\n"));
    }
}
