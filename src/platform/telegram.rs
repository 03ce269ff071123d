use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, ChatMember, ChatMemberUpdated, MessageEntityKind, MessageId, ThreadId, User,
};

use crate::platform::{
    ChatActions, EntityKind, IncomingMessage, MemberJoined, MessageOrigin, MessageRef, Sender,
};

/// [`ChatActions`] over the Telegram Bot API
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatActions for TelegramChat {
    async fn send_text(
        &self,
        chat_id: i64,
        thread_id: Option<i32>,
        text: &str,
    ) -> Result<MessageRef> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(thread_id) = thread_id {
            request = request.message_thread_id(ThreadId(MessageId(thread_id)));
        }
        let sent = request
            .await
            .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
        Ok(message_ref(&sent))
    }

    async fn delete(&self, message: MessageRef) -> Result<()> {
        self.bot
            .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
            .await
            .with_context(|| {
                format!(
                    "Failed to delete message {} in chat {}",
                    message.message_id, message.chat_id
                )
            })?;
        Ok(())
    }
}

pub fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
    }
}

pub fn sender_from_user(user: &User) -> Sender {
    Sender {
        id: user.id.0,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
    }
}

fn entity_kind(kind: &MessageEntityKind) -> EntityKind {
    match kind {
        MessageEntityKind::Url => EntityKind::Url,
        MessageEntityKind::TextLink { .. } => EntityKind::TextLink,
        other => EntityKind::Other(format!("{:?}", other)),
    }
}

/// Forum topic of a message. Replies to non-topic messages also carry a
/// thread id, so only topic messages count.
pub fn topic_thread_id(msg: &Message) -> Option<i32> {
    if !msg.is_topic_message {
        return None;
    }
    msg.thread_id.map(|ThreadId(MessageId(id))| id)
}

/// Dispatcher predicate: the message carries non-empty text
pub fn has_text(msg: &Message) -> bool {
    msg.text().is_some_and(|t| !t.is_empty())
}

/// Build the moderation view of a text message.
///
/// Returns `None` for messages without text or without a sender.
pub fn incoming_message(msg: &Message, origin: MessageOrigin) -> Option<IncomingMessage> {
    let user = msg.from.as_ref()?;
    let text = msg.text().filter(|t| !t.is_empty())?;

    let entities = msg
        .entities()
        .map(|entities| entities.iter().map(|e| entity_kind(&e.kind)).collect())
        .unwrap_or_default();

    Some(IncomingMessage {
        message: message_ref(msg),
        thread_id: topic_thread_id(msg),
        origin,
        sender: sender_from_user(user),
        text: text.to_string(),
        entities,
    })
}

fn is_member(member: &ChatMember) -> bool {
    member.kind.is_present()
}

/// Dispatcher predicate: the update moves a user from outside the chat into it
pub fn is_new_join(update: &ChatMemberUpdated) -> bool {
    !is_member(&update.old_chat_member) && is_member(&update.new_chat_member)
}

pub fn member_joined(update: &ChatMemberUpdated) -> MemberJoined {
    MemberJoined {
        chat_id: update.chat.id.0,
        user: sender_from_user(&update.new_chat_member.user),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_message(json: serde_json::Value) -> Message {
        serde_json::from_value(json).unwrap()
    }

    fn group_message(extra: serde_json::Value) -> Message {
        let mut base = serde_json::json!({
            "message_id": 55,
            "date": 1_700_000_000,
            "chat": {"id": -1001234, "type": "supergroup", "title": "Rentals"},
            "from": {"id": 4242, "is_bot": false, "first_name": "Olga", "username": "olga"}
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        parse_message(base)
    }

    #[test]
    fn test_incoming_message_collects_link_entities() {
        let msg = group_message(serde_json::json!({
            "text": "see https://example.com now",
            "entities": [
                {"type": "url", "offset": 4, "length": 19},
                {"type": "bold", "offset": 0, "length": 3}
            ]
        }));

        let incoming = incoming_message(&msg, MessageOrigin::New).unwrap();
        assert_eq!(
            incoming.message,
            MessageRef {
                chat_id: -1001234,
                message_id: 55
            }
        );
        assert_eq!(incoming.sender.id, 4242);
        assert_eq!(incoming.sender.username.as_deref(), Some("olga"));
        assert_eq!(incoming.text, "see https://example.com now");
        assert_eq!(incoming.entities.len(), 2);
        assert_eq!(incoming.entities[0], EntityKind::Url);
        assert_eq!(incoming.link_count(), 1);
    }

    #[test]
    fn test_text_link_entity_is_a_link() {
        let msg = group_message(serde_json::json!({
            "text": "click here",
            "entities": [
                {"type": "text_link", "offset": 0, "length": 10, "url": "https://example.com/"}
            ]
        }));

        let incoming = incoming_message(&msg, MessageOrigin::Edited).unwrap();
        assert_eq!(incoming.entities, vec![EntityKind::TextLink]);
        assert_eq!(incoming.origin, MessageOrigin::Edited);
    }

    #[test]
    fn test_absent_entities_become_empty() {
        let msg = group_message(serde_json::json!({"text": "just words"}));

        let incoming = incoming_message(&msg, MessageOrigin::New).unwrap();
        assert!(incoming.entities.is_empty());
        assert!(has_text(&msg));
    }

    #[test]
    fn test_topic_message_keeps_thread_id() {
        let msg = parse_message(serde_json::json!({
            "message_id": 5,
            "message_thread_id": 4242,
            "is_topic_message": true,
            "date": 1_700_000_000,
            "chat": {"id": -100777, "type": "supergroup", "title": "Rentals", "is_forum": true},
            "from": {"id": 4242, "is_bot": false, "first_name": "Olga"},
            "text": "room for rent"
        }));

        let incoming = incoming_message(&msg, MessageOrigin::New).unwrap();
        assert_eq!(
            incoming.message,
            MessageRef {
                chat_id: -100777,
                message_id: 5
            }
        );
        assert_eq!(incoming.thread_id, Some(4242));
    }

    #[test]
    fn test_plain_group_message_has_no_thread_id() {
        let msg = group_message(serde_json::json!({"text": "room for rent"}));

        let incoming = incoming_message(&msg, MessageOrigin::New).unwrap();
        assert_eq!(incoming.thread_id, None);
    }

    #[test]
    fn test_join_notice_has_no_text() {
        let msg = group_message(serde_json::json!({
            "new_chat_members": [
                {"id": 99, "is_bot": false, "first_name": "New"}
            ]
        }));

        assert!(msg.new_chat_members().is_some());
        assert!(!has_text(&msg));
        assert!(incoming_message(&msg, MessageOrigin::New).is_none());
    }

    fn member_update(old_status: &str, new_status: &str) -> ChatMemberUpdated {
        let user = serde_json::json!({"id": 99, "is_bot": false, "first_name": "Anna", "last_name": "K", "username": "anna"});
        serde_json::from_value(serde_json::json!({
            "chat": {"id": -1001234, "type": "supergroup", "title": "Rentals"},
            "from": user,
            "date": 1_700_000_000,
            "old_chat_member": {"status": old_status, "user": user},
            "new_chat_member": {"status": new_status, "user": user}
        }))
        .unwrap()
    }

    #[test]
    fn test_left_to_member_is_a_join() {
        let update = member_update("left", "member");
        assert!(is_new_join(&update));

        let joined = member_joined(&update);
        assert_eq!(joined.chat_id, -1001234);
        assert_eq!(joined.user.id, 99);
        assert_eq!(joined.user.full_name(), "Anna K");
    }

    #[test]
    fn test_member_leaving_is_not_a_join() {
        assert!(!is_new_join(&member_update("member", "left")));
        assert!(!is_new_join(&member_update("member", "member")));
    }
}
