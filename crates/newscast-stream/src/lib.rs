//! Newscast streaming delivery.
//!
//! Keeps the set of long-lived event-stream connections, detects changes to
//! the news list by polling, and fans each change out to every connection.

pub mod broadcaster;
pub mod client;
pub mod detector;
pub mod error;
pub mod frame;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcaster::{BroadcastReport, ShutdownReport, StreamBroadcaster, StreamSettings};
pub use client::{ChannelSink, ClientId, ClientState, FrameSink, StreamClient};
pub use detector::{ChangeDetector, NewsFeed};
pub use error::{StreamError, StreamResult};
pub use frame::{Event, EVENT_KIND};
pub use registry::ClientRegistry;
