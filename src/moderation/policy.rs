use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::ModerationConfig;
use crate::moderation::{Allowlist, PhonePattern};
use crate::platform::{ChatActions, IncomingMessage, MessageRef};

/// A rule a message broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    MissingPhone,
    Link,
}

/// A bot warning that must disappear once its time is up.
///
/// Owned by the handler that posted it; dropping it without calling
/// [`PendingWarning::expire`] leaves the warning in the chat.
#[derive(Debug)]
pub struct PendingWarning {
    message: MessageRef,
    due: Instant,
}

impl PendingWarning {
    pub fn schedule(message: MessageRef, ttl: Duration) -> Self {
        Self {
            message,
            due: Instant::now() + ttl,
        }
    }

    /// Wait until the warning is due, then delete it
    pub async fn expire(self, chat: &dyn ChatActions) {
        sleep_until(self.due).await;
        match chat.delete(self.message).await {
            Ok(()) => info!(
                "Bot warning {} removed from chat {}",
                self.message.message_id, self.message.chat_id
            ),
            Err(e) => warn!("Could not remove bot warning: {:#}", e),
        }
    }
}

/// Enforces the phone-number-required and no-links rules
pub struct Moderator {
    allowlist: Allowlist,
    phone: PhonePattern,
    warning_ttl: Duration,
    phone_warning: String,
    link_warning: String,
}

impl Moderator {
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        Ok(Self {
            allowlist: Allowlist::new(config.allowed_user_ids.iter().copied()),
            phone: PhonePattern::new(&config.phone_pattern)?,
            warning_ttl: config.warning_ttl(),
            phone_warning: config.phone_warning.clone(),
            link_warning: config.link_warning.clone(),
        })
    }

    pub fn allowlist(&self) -> &Allowlist {
        &self.allowlist
    }

    pub fn warning_ttl(&self) -> Duration {
        self.warning_ttl
    }

    /// Every rule the message breaks, in enforcement order.
    ///
    /// The phone rule comes first and appears at most once; each link entity
    /// adds one `Link`. Does not look at the sender; see [`Moderator::check`].
    pub fn violations(&self, msg: &IncomingMessage) -> Vec<Violation> {
        let mut found = Vec::new();
        if !self.phone.is_found_in(&msg.text) {
            found.push(Violation::MissingPhone);
        }
        for entity in &msg.entities {
            debug!("Entity type: {:?}", entity);
            if entity.is_link() {
                found.push(Violation::Link);
            }
        }
        found
    }

    /// Run both checks against a new or edited message and act on the result
    pub async fn check(&self, chat: &dyn ChatActions, msg: &IncomingMessage) {
        info!(
            "Checking {} message {} from {} ({}), {} link(s): {}",
            msg.origin,
            msg.message.message_id,
            msg.sender.handle(),
            msg.sender.id,
            msg.link_count(),
            msg.text
        );

        if self.allowlist.contains(msg.sender.id) {
            info!(
                "Admin {} sent {} message: {}",
                msg.sender.id, msg.origin, msg.text
            );
            return;
        }

        for violation in self.violations(msg) {
            self.enforce(chat, msg, violation).await;
        }
    }

    /// Warn, delete the offending message, and remove the warning after the delay
    async fn enforce(&self, chat: &dyn ChatActions, msg: &IncomingMessage, violation: Violation) {
        let text = match violation {
            Violation::MissingPhone => &self.phone_warning,
            Violation::Link => &self.link_warning,
        };

        info!(
            "{:?} in message from ({} {}): {}",
            violation,
            msg.sender.handle(),
            msg.sender.id,
            msg.text
        );

        let pending = match chat.send_text(msg.message.chat_id, msg.thread_id, text).await {
            Ok(warning) => Some(PendingWarning::schedule(warning, self.warning_ttl)),
            Err(e) => {
                warn!("Could not post {:?} warning: {:#}", violation, e);
                None
            }
        };

        match chat.delete(msg.message).await {
            Ok(()) => info!(
                "Message {} from ({} {}) deleted",
                msg.message.message_id,
                msg.sender.handle(),
                msg.sender.id
            ),
            Err(e) => warn!(
                "Could not delete message {}: {:#}",
                msg.message.message_id, e
            ),
        }

        if let Some(pending) = pending {
            info!(
                "Removing bot warning in {} sec.",
                self.warning_ttl.as_secs()
            );
            pending.expire(chat).await;
        }
    }
}
