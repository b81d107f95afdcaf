//! Domain models for news items and push targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NewscastError;

/// A single published news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The full, ordered news list as seen by one poll of the data source.
///
/// Two snapshots are equal only if every item is equal and in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewsSnapshot(Vec<NewsItem>);

impl NewsSnapshot {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self(items)
    }

    pub fn items(&self) -> &[NewsItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mobile platform of a push target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = NewscastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(NewscastError::validation(format!(
                "Unknown platform '{}'. Valid platforms: ios, android",
                other
            ))),
        }
    }
}

/// A device reachable through the push gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTarget {
    pub device_id: String,
    pub token: String,
    pub platform: Platform,
    pub updated_at: DateTime<Utc>,
}

impl PushTarget {
    /// Whether the target carries a usable device token.
    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}
