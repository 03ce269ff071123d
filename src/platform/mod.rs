pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

/// Identifies one message in one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Who sent a message or joined a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: u64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl Sender {
    /// Username without the `@`, or a placeholder when the account has none
    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or("-")
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// The kind of an annotated sub-range of message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// A bare URL typed into the text
    Url,
    /// Text with an embedded hyperlink
    TextLink,
    /// Anything else (mentions, formatting, hashtags...)
    Other(String),
}

impl EntityKind {
    pub fn is_link(&self) -> bool {
        matches!(self, EntityKind::Url | EntityKind::TextLink)
    }
}

/// Whether a message arrived fresh or as an edit of an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    New,
    Edited,
}

impl std::fmt::Display for MessageOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageOrigin::New => write!(f, "new"),
            MessageOrigin::Edited => write!(f, "edited"),
        }
    }
}

/// A user-authored text message, stripped down to what moderation needs
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message: MessageRef,
    /// Forum topic the message was posted in; replies must go to the same topic
    pub thread_id: Option<i32>,
    pub origin: MessageOrigin,
    pub sender: Sender,
    pub text: String,
    /// Empty when the platform sent no annotations at all
    pub entities: Vec<EntityKind>,
}

impl IncomingMessage {
    pub fn link_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_link()).count()
    }
}

/// A user went from "not a member" to "member"
#[derive(Debug, Clone)]
pub struct MemberJoined {
    pub chat_id: i64,
    pub user: Sender,
}

/// Platform-generated notice the moderator removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNotice {
    MemberJoined,
    MemberLeft,
}

impl std::fmt::Display for SystemNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemNotice::MemberJoined => write!(f, "member joined"),
            SystemNotice::MemberLeft => write!(f, "member left"),
        }
    }
}

/// Chat operations the moderation handlers rely on.
///
/// Telegram implements this in [`telegram::TelegramChat`]; tests use an
/// in-memory recorder.
#[async_trait]
pub trait ChatActions: Send + Sync {
    /// Post `text` into the chat (inside `thread_id` when given) and return a
    /// handle to the new message
    async fn send_text(
        &self,
        chat_id: i64,
        thread_id: Option<i32>,
        text: &str,
    ) -> Result<MessageRef>;

    async fn delete(&self, message: MessageRef) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(username: Option<&str>, last_name: Option<&str>) -> Sender {
        Sender {
            id: 7,
            username: username.map(str::to_string),
            first_name: "Ivan".to_string(),
            last_name: last_name.map(str::to_string),
        }
    }

    #[test]
    fn test_full_name_with_and_without_last_name() {
        assert_eq!(sender(None, Some("Petrov")).full_name(), "Ivan Petrov");
        assert_eq!(sender(None, None).full_name(), "Ivan");
    }

    #[test]
    fn test_handle_falls_back_to_placeholder() {
        assert_eq!(sender(Some("ivan"), None).handle(), "ivan");
        assert_eq!(sender(None, None).handle(), "-");
    }

    #[test]
    fn test_link_count_ignores_other_entities() {
        let msg = IncomingMessage {
            message: MessageRef {
                chat_id: -100,
                message_id: 1,
            },
            thread_id: None,
            origin: MessageOrigin::New,
            sender: sender(None, None),
            text: "hi".to_string(),
            entities: vec![
                EntityKind::Url,
                EntityKind::Other("bold".to_string()),
                EntityKind::TextLink,
            ],
        };
        assert_eq!(msg.link_count(), 2);
    }
}
