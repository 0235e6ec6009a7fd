/// Force-subscribe gate: users must be members of the update channel.
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, InlineKeyboardButton, InlineKeyboardMarkup, Recipient, UserId};
use tracing::{debug, warn};

use crate::callback_state::CallbackAction;
use crate::commands::{send_card, AppState};

/// Membership check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    /// No channel configured, or the user is a member.
    Allowed,
    /// The user is not a current member of the channel.
    NotJoined,
    /// Telegram refused the lookup (bot not admin in channel, bad username, ...).
    Unknown(String),
}

/// Gate decision for a member kind reported by Telegram.
pub fn membership_of(kind: &ChatMemberKind) -> Membership {
    if kind.is_present() {
        Membership::Allowed
    } else {
        Membership::NotJoined
    }
}

/// Look up the user's membership in the configured channel.
pub async fn check_membership(bot: &Bot, state: &AppState, user_id: UserId) -> Membership {
    let channel = match &state.config.force_sub_channel {
        Some(c) => c,
        None => return Membership::Allowed,
    };

    match bot
        .get_chat_member(Recipient::ChannelUsername(format!("@{}", channel)), user_id)
        .await
    {
        Ok(member) => {
            let membership = membership_of(&member.kind);
            if membership == Membership::NotJoined {
                debug!("User {} has not joined @{}", user_id.0, channel);
            }
            membership
        }
        Err(e) => {
            warn!("Membership lookup failed for {} in @{}: {}", user_id.0, channel, e);
            Membership::Unknown(e.to_string())
        }
    }
}

/// Keyboard shown with the gate message.
pub fn gate_keyboard(channel_url: url::Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url("📢 Join Update Channel", channel_url)],
        vec![InlineKeyboardButton::callback(
            "✅ I've Joined",
            CallbackAction::CheckSubscription.as_str(),
        )],
    ])
}

/// Run the gate for an incoming message. Returns true if the user may proceed;
/// otherwise the appropriate reply has already been sent.
pub async fn ensure_subscribed(bot: &Bot, msg: &Message, state: &AppState) -> ResponseResult<bool> {
    let user = match msg.from() {
        Some(u) => u,
        None => return Ok(false),
    };

    match check_membership(bot, state, user.id).await {
        Membership::Allowed => Ok(true),
        Membership::NotJoined => {
            let caption = format!(
                "<b>Hi {},\n\nTo use this bot, you must join our channel first.</b>",
                teloxide::utils::html::escape(&user.first_name)
            );
            let keyboard = state
                .config
                .channel_url()
                .and_then(|u| url::Url::parse(&u).ok())
                .map(gate_keyboard);

            send_card(bot, msg.chat.id, state.welcome_photo(), caption, keyboard).await?;
            Ok(false)
        }
        Membership::Unknown(err) => {
            bot.send_message(msg.chat.id, format!("🚫 An error occurred: {}", err))
                .await?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::{Restricted, UntilDate};

    fn restricted(is_member: bool) -> ChatMemberKind {
        ChatMemberKind::Restricted(Restricted {
            until_date: UntilDate::Forever,
            is_member,
            can_send_messages: true,
            can_send_media_messages: false,
            can_send_other_messages: false,
            can_add_web_page_previews: false,
            can_change_info: false,
            can_invite_users: false,
            can_pin_messages: false,
            can_manage_topics: false,
            can_send_polls: false,
        })
    }

    #[test]
    fn test_membership_kinds() {
        assert_eq!(membership_of(&ChatMemberKind::Member), Membership::Allowed);
        assert_eq!(membership_of(&ChatMemberKind::Left), Membership::NotJoined);
        assert_eq!(membership_of(&restricted(true)), Membership::Allowed);
        // restricted users who already left the channel must not pass the gate
        assert_eq!(membership_of(&restricted(false)), Membership::NotJoined);
    }

    #[test]
    fn test_gate_keyboard_layout() {
        let kb = gate_keyboard(url::Url::parse("https://t.me/updates").unwrap());
        assert_eq!(kb.inline_keyboard.len(), 2);
        assert_eq!(kb.inline_keyboard[0][0].text, "📢 Join Update Channel");
        assert_eq!(kb.inline_keyboard[1][0].text, "✅ I've Joined");
    }
}
