use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;
use tracing::{debug, info};

use crate::moderation::{self, Moderator};
use crate::platform::telegram::{self, TelegramChat};
use crate::platform::{MessageOrigin, SystemNotice};

/// Start the Telegram bot and dispatch updates until stopped
pub async fn run(bot_token: &str, moderator: Arc<Moderator>) -> Result<()> {
    let bot = Bot::new(bot_token);

    info!("Starting Telegram bot...");

    Dispatcher::builder(bot, handler_tree())
        .dependencies(dptree::deps![moderator])
        // Warnings sleep inside their handler, so updates from one chat must
        // not queue behind each other.
        .distribution_function(|_| None::<Infallible>)
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("moderation"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}

/// Which endpoint a new or edited message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageRoute {
    JoinNotice,
    LeaveNotice,
    Text,
}

/// Membership notices win over text; anything else is not ours.
fn message_route(msg: &Message) -> Option<MessageRoute> {
    if msg.new_chat_members().is_some() {
        Some(MessageRoute::JoinNotice)
    } else if msg.left_chat_member().is_some() {
        Some(MessageRoute::LeaveNotice)
    } else if telegram::has_text(msg) {
        Some(MessageRoute::Text)
    } else {
        None
    }
}

/// Every (filter, endpoint) pair the bot reacts to
fn handler_tree() -> UpdateHandler<teloxide::RequestError> {
    let member_joins = Update::filter_chat_member()
        .filter(|update: ChatMemberUpdated| telegram::is_new_join(&update))
        .endpoint(on_member_joined);

    let messages = Update::filter_message()
        .filter_map(|msg: Message| message_route(&msg))
        .branch(dptree::case![MessageRoute::JoinNotice].endpoint(on_join_notice))
        .branch(dptree::case![MessageRoute::LeaveNotice].endpoint(on_leave_notice))
        .branch(dptree::case![MessageRoute::Text].endpoint(on_message));

    let edits = Update::filter_edited_message()
        .filter_map(|msg: Message| message_route(&msg))
        .branch(dptree::case![MessageRoute::Text].endpoint(on_edited_message));

    dptree::entry()
        .branch(member_joins)
        .branch(messages)
        .branch(edits)
}

async fn on_member_joined(update: ChatMemberUpdated) -> ResponseResult<()> {
    moderation::log_member_joined(&telegram::member_joined(&update));
    Ok(())
}

async fn on_join_notice(bot: Bot, msg: Message) -> ResponseResult<()> {
    let chat = TelegramChat::new(bot);
    moderation::suppress_notice(&chat, telegram::message_ref(&msg), SystemNotice::MemberJoined)
        .await;
    Ok(())
}

async fn on_leave_notice(bot: Bot, msg: Message) -> ResponseResult<()> {
    let chat = TelegramChat::new(bot);
    moderation::suppress_notice(&chat, telegram::message_ref(&msg), SystemNotice::MemberLeft)
        .await;
    Ok(())
}

async fn on_message(bot: Bot, msg: Message, moderator: Arc<Moderator>) -> ResponseResult<()> {
    check_message(bot, &msg, MessageOrigin::New, &moderator).await;
    Ok(())
}

async fn on_edited_message(
    bot: Bot,
    msg: Message,
    moderator: Arc<Moderator>,
) -> ResponseResult<()> {
    check_message(bot, &msg, MessageOrigin::Edited, &moderator).await;
    Ok(())
}

async fn check_message(bot: Bot, msg: &Message, origin: MessageOrigin, moderator: &Moderator) {
    let incoming = match telegram::incoming_message(msg, origin) {
        Some(incoming) => incoming,
        None => {
            debug!("Skipping {} message {} without a sender", origin, msg.id.0);
            return;
        }
    };

    let chat = TelegramChat::new(bot);
    moderator.check(&chat, &incoming).await;
}
