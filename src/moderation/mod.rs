pub mod policy;

use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::platform::{ChatActions, MemberJoined, MessageRef, SystemNotice};

pub use policy::Moderator;

/// Sender ids exempt from content policy, fixed at startup
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    ids: HashSet<u64>,
}

impl Allowlist {
    pub fn new(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, user_id: u64) -> bool {
        self.ids.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Presence test for phone-number-shaped text
#[derive(Debug, Clone)]
pub struct PhonePattern {
    regex: Regex,
}

impl PhonePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid phone number pattern: {}", pattern))?;
        Ok(Self { regex })
    }

    /// True if any substring of `text` looks like a phone number
    pub fn is_found_in(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Log a user joining the chat. Nothing is posted.
pub fn log_member_joined(event: &MemberJoined) {
    info!(
        "User joined chat {}: name - {}, username - {}, id - {}",
        event.chat_id,
        event.user.full_name(),
        event.user.handle(),
        event.user.id
    );
}

/// Delete a platform-generated join/leave notice.
///
/// Best-effort: a rejected delete is logged and swallowed.
pub async fn suppress_notice(chat: &dyn ChatActions, message: MessageRef, notice: SystemNotice) {
    match chat.delete(message).await {
        Ok(()) => info!(
            "Removed '{}' notice {} in chat {}",
            notice, message.message_id, message.chat_id
        ),
        Err(e) => warn!("Could not remove '{}' notice: {:#}", notice, e),
    }
}
