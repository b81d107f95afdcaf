//! Push message model.
//!
//! Serializes to the gateway's `message` object: token, notification,
//! string-only data map and per-platform option blocks.

use std::collections::BTreeMap;

use newscast_core::{NewsItem, Platform, PushTarget};
use serde::{Serialize, Serializer};

/// Android intent action opened when the notification is tapped.
pub const ANDROID_CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// Value of the `type` data key for news notifications.
pub const NEWS_DATA_TYPE: &str = "NEWS";

const DEFAULT_SOUND: &str = "default";

/// What a news notification says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsNotification {
    pub news_id: i64,
    pub title: String,
    pub body: String,
}

impl NewsNotification {
    /// Data map delivered alongside the visible notification.
    pub fn data(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("newsId".to_string(), self.news_id.to_string()),
            ("type".to_string(), NEWS_DATA_TYPE.to_string()),
        ])
    }
}

impl From<&NewsItem> for NewsNotification {
    fn from(item: &NewsItem) -> Self {
        Self {
            news_id: item.id,
            title: item.title.clone(),
            body: item.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidConfig {
    pub priority: String,
    pub notification: AndroidNotification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AndroidNotification {
    pub sound: String,
    pub click_action: String,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            priority: "high".to_string(),
            notification: AndroidNotification {
                sound: DEFAULT_SOUND.to_string(),
                click_action: ANDROID_CLICK_ACTION.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnsConfig {
    pub payload: ApnsPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnsPayload {
    pub aps: Aps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aps {
    pub sound: String,
    #[serde(rename = "content-available", serialize_with = "apns_flag")]
    pub content_available: bool,
    #[serde(rename = "mutable-content", serialize_with = "apns_flag")]
    pub mutable_content: bool,
}

impl Default for ApnsConfig {
    fn default() -> Self {
        Self {
            payload: ApnsPayload {
                aps: Aps {
                    sound: DEFAULT_SOUND.to_string(),
                    content_available: true,
                    mutable_content: true,
                },
            },
        }
    }
}

/// APNs expects `1` for set flags.
fn apns_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// One gateway message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub notification: Notification,
    pub data: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<AndroidConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsConfig>,
}

impl PushMessage {
    fn base(payload: &NewsNotification) -> Self {
        Self {
            token: None,
            notification: Notification {
                title: payload.title.clone(),
                body: payload.body.clone(),
            },
            data: payload.data(),
            android: None,
            apns: None,
        }
    }

    /// Message for one device, carrying only its platform's options.
    pub fn for_target(target: &PushTarget, payload: &NewsNotification) -> Self {
        let mut message = Self::base(payload);
        message.token = Some(target.token.clone());
        match target.platform {
            Platform::Ios => message.apns = Some(ApnsConfig::default()),
            Platform::Android => message.android = Some(AndroidConfig::default()),
        }
        message
    }

    /// Token-less message with options for every platform, for multicast.
    pub fn for_all_platforms(payload: &NewsNotification) -> Self {
        let mut message = Self::base(payload);
        message.android = Some(AndroidConfig::default());
        message.apns = Some(ApnsConfig::default());
        message
    }

    /// Copy of this message addressed to `token`.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }
}

/// One message sent to many tokens in a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub message: PushMessage,
    pub tokens: Vec<String>,
}

impl MulticastMessage {
    pub fn new(targets: &[PushTarget], payload: &NewsNotification) -> Self {
        Self {
            message: PushMessage::for_all_platforms(payload),
            tokens: targets.iter().map(|t| t.token.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::target;
    use serde_json::json;

    fn payload() -> NewsNotification {
        NewsNotification {
            news_id: 17,
            title: "Snow day".to_string(),
            body: "School is closed tomorrow".to_string(),
        }
    }

    #[test]
    fn test_ios_message() {
        let message = PushMessage::for_target(&target("t-ios", Platform::Ios), &payload());
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(
            json,
            json!({
                "token": "t-ios",
                "notification": { "title": "Snow day", "body": "School is closed tomorrow" },
                "data": { "newsId": "17", "type": "NEWS" },
                "apns": { "payload": { "aps": {
                    "sound": "default",
                    "content-available": 1,
                    "mutable-content": 1
                } } }
            })
        );
    }

    #[test]
    fn test_android_message() {
        let message = PushMessage::for_target(&target("t-droid", Platform::Android), &payload());
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["token"], "t-droid");
        assert_eq!(json["android"]["priority"], "high");
        assert_eq!(json["android"]["notification"]["sound"], "default");
        assert_eq!(json["android"]["notification"]["click_action"], ANDROID_CLICK_ACTION);
        assert!(json.get("apns").is_none());
    }

    #[test]
    fn test_multicast_carries_both_platforms() {
        let targets = vec![target("a", Platform::Ios), target("b", Platform::Android)];
        let multicast = MulticastMessage::new(&targets, &payload());

        assert_eq!(multicast.tokens, vec!["a", "b"]);
        assert!(multicast.message.token.is_none());
        assert!(multicast.message.android.is_some());
        assert!(multicast.message.apns.is_some());
        assert_eq!(multicast.message.with_token("b").token.as_deref(), Some("b"));
    }
}
