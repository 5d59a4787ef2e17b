//! Self-service cabinet flow
//!
//! A customer opens the cabinet with an inline button. On the first visit we
//! ask for the phone number and remember the link; on return visits the link
//! resolves the cabinet directly.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::loyalty::{Customer, IdentityLink};
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::session::Session;

/// Callback payload of the cabinet button
pub const CABINET_OPEN: &str = "cabinet_open";

/// Reply used when the record store is unreachable or unconfigured.
pub const STORE_DOWN_REPLY: &str = "Сервис бонусов временно недоступен. Попробуйте позже.";

/// Keyboard attached to the /start greeting.
pub fn start_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "🔐 Личный кабинет",
        CABINET_OPEN,
    )]])
}

fn render_cabinet(customer: &Customer) -> String {
    format!(
        "Ваш телефон: {}\nУровень: {}\nБонусы: {}",
        customer.phone, customer.tier, customer.bonus_balance
    )
}

/// Handles the cabinet button press.
///
/// With an existing identity link the cabinet renders immediately and the
/// session stays idle; otherwise the user is asked for a phone number.
pub async fn handle_cabinet_open(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    match deps.store.find_link(user_id).await {
        Ok(Some(link)) => {
            match deps.ledger.lookup_or_create(&link.phone, &link.display_name).await {
                Ok(customer) => {
                    bot.send_message(chat_id, render_cabinet(&customer)).await?;
                    deps.sessions.reset(user_id);
                }
                Err(e) => {
                    log::error!("Cabinet lookup failed for user {}: {}", user_id, e);
                    bot.send_message(chat_id, STORE_DOWN_REPLY).await?;
                }
            }
        }
        Ok(None) => {
            bot.send_message(chat_id, "Введите ваш номер телефона в формате +79XXXXXXXXX")
                .await?;
            deps.sessions.set(user_id, Session::AwaitingPhone);
        }
        Err(e) => {
            log::error!("Link lookup failed for user {}: {}", user_id, e);
            bot.send_message(chat_id, STORE_DOWN_REPLY).await?;
        }
    }
    Ok(())
}

/// Handles the phone number a customer typed in for their own cabinet.
///
/// Creates the customer on first contact, records the identity link for the
/// next visit and renders the cabinet. The session goes back to idle either
/// way.
pub async fn handle_phone_input(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    full_name: &str,
    text: &str,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    let phone = text.trim();

    match deps.ledger.lookup_or_create(phone, full_name).await {
        Ok(customer) => {
            if let Err(e) = deps
                .store
                .upsert_link(&IdentityLink::new(user_id, phone, full_name))
                .await
            {
                // The cabinet still renders; the user just gets asked again next time
                log::error!("Failed to save identity link for user {}: {}", user_id, e);
            }
            bot.send_message(chat_id, render_cabinet(&customer)).await?;
        }
        Err(e) => {
            log::error!("Cabinet phone flow failed for user {}: {}", user_id, e);
            bot.send_message(chat_id, STORE_DOWN_REPLY).await?;
        }
    }

    deps.sessions.reset(user_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loyalty::Tier;

    #[test]
    fn test_render_cabinet_shows_tier_and_balance() {
        let mut customer = Customer::new("+79001234567", "Анна");
        customer.tier = Tier::Silver;
        customer.bonus_balance = 32.0;
        let text = render_cabinet(&customer);
        assert!(text.contains("+79001234567"));
        assert!(text.contains("silver"));
        assert!(text.contains("32"));
    }

    #[test]
    fn test_start_keyboard_has_cabinet_payload() {
        let keyboard = start_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);
    }
}
