//! Bot API value types: parameter enumerations and result shapes.
//!
//! Result shapes keep the fields this library reads and collect everything
//! else the remote returns in an `extra` map, so a decoded value serializes
//! back to the object it was decoded from.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Target chat: a numeric id or a `@channelusername`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{id}"),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

/// Lets unsuffixed integer literals stand in for a chat id.
impl From<i32> for ChatId {
    fn from(id: i32) -> Self {
        ChatId::Id(i64::from(id))
    }
}

impl From<&str> for ChatId {
    fn from(name: &str) -> Self {
        ChatId::Username(name.to_string())
    }
}

impl From<String> for ChatId {
    fn from(name: String) -> Self {
        ChatId::Username(name)
    }
}

/// Text formatting mode accepted by `parse_mode` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    Markdown,
    MarkdownV2,
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollType {
    Regular,
    Quiz,
}

/// Keyboard or reply-interface attached to an outgoing message.
///
/// Passed through to the remote as-is; the only local check is that it is
/// a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyMarkup(pub Value);

impl ReplyMarkup {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Inline keyboard of `(label, callback_data)` buttons, one `Vec` per row.
    pub fn inline_keyboard<S: Into<String>>(rows: Vec<Vec<(S, S)>>) -> Self {
        let rows: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(text, data)| json!({ "text": text.into(), "callback_data": data.into() }))
                    .collect()
            })
            .collect();
        Self(json!({ "inline_keyboard": rows }))
    }

    pub fn remove_keyboard() -> Self {
        Self(json!({ "remove_keyboard": true }))
    }

    pub fn force_reply() -> Self {
        Self(json!({ "force_reply": true }))
    }

    pub(crate) fn is_object(&self) -> bool {
        self.0.is_object()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_join_groups: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_read_all_group_messages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_inline_queries: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    pub chat: Chat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Extra details the remote attaches to some failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrate_to_chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
}

/// The envelope every Bot API response is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i64>,
    pub description: Option<String>,
    pub parameters: Option<ResponseParameters>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(ChatId::from(42)).unwrap(), json!(42));
        assert_eq!(
            serde_json::to_value(ChatId::from("@news")).unwrap(),
            json!("@news")
        );
    }

    #[test]
    fn parse_mode_uses_remote_names() {
        assert_eq!(serde_json::to_value(ParseMode::Html).unwrap(), json!("HTML"));
        assert_eq!(
            serde_json::to_value(ParseMode::MarkdownV2).unwrap(),
            json!("MarkdownV2")
        );
        assert!(serde_json::from_value::<ParseMode>(json!("html")).is_err());
    }

    #[test]
    fn message_keeps_unknown_fields() {
        let raw = json!({
            "message_id": 7,
            "chat": {"id": 42, "type": "private", "first_name": "Ann"},
            "date": 1700000000,
            "sticker": {"file_id": "abc"}
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(msg.message_id, 7);
        assert_eq!(msg.chat.kind, "private");
        assert_eq!(msg.extra["sticker"]["file_id"], "abc");
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn inline_keyboard_builds_rows() {
        let markup = ReplyMarkup::inline_keyboard(vec![vec![("Yes", "y"), ("No", "n")]]);
        assert_eq!(markup.0["inline_keyboard"][0][1]["callback_data"], "n");
        assert!(markup.is_object());
    }

    #[test]
    fn keyboard_helpers_build_objects() {
        assert_eq!(ReplyMarkup::remove_keyboard().0, json!({"remove_keyboard": true}));
        assert_eq!(ReplyMarkup::force_reply().0, json!({"force_reply": true}));
    }
}
