//! Admin flow: customer selection, purchases, bonus redemption
//!
//! Admin mode is gated by the `ADMIN_IDS` allow-list and is a small state
//! machine: phone entry -> action menu -> amount entry -> back to the menu.
//! Errors re-prompt in place; only a lost selection (process restart) kicks
//! the admin back to phone entry.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::config;
use crate::core::error::AppError;
use crate::loyalty::Customer;
use crate::telegram::cabinet::STORE_DOWN_REPLY;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::session::Session;

/// Callback payload of the "purchase" menu button
pub const ADMIN_PURCHASE: &str = "admin_purchase";
/// Callback payload of the "redeem" menu button
pub const ADMIN_REDEEM: &str = "admin_redeem";

const ACCESS_DENIED_REPLY: &str = "Нет доступа.";
const SESSION_EXPIRED_REPLY: &str = "Сессия устарела. Отправь номер телефона клиента ещё раз.";

/// Check if user is admin
pub fn is_admin(user_id: i64) -> bool {
    is_admin_among(&config::ADMIN_IDS, user_id)
}

fn is_admin_among(admin_ids: &[i64], user_id: i64) -> bool {
    admin_ids.contains(&user_id)
}

/// Action behind an admin menu button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Purchase,
    Redeem,
}

/// Maps a callback payload to a menu action; anything else is ignored by the
/// admin menu.
pub fn menu_action_for(data: &str) -> Option<MenuAction> {
    match data {
        ADMIN_PURCHASE => Some(MenuAction::Purchase),
        ADMIN_REDEEM => Some(MenuAction::Redeem),
        _ => None,
    }
}

fn admin_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("➕ Покупка", ADMIN_PURCHASE)],
        vec![InlineKeyboardButton::callback("➖ Списать бонусы", ADMIN_REDEEM)],
    ])
}

fn render_customer_card(customer: &Customer) -> String {
    format!(
        "Клиент: {}\nУровень: {}\nОборот: {}\nБонусы: {}",
        customer.phone, customer.tier, customer.turnover, customer.bonus_balance
    )
}

/// Handles /admin. Non-allow-listed users get a denial and no state change.
pub async fn handle_admin_command(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    if !is_admin(user_id) {
        bot.send_message(chat_id, ACCESS_DENIED_REPLY).await?;
        return Ok(());
    }

    bot.send_message(
        chat_id,
        "Админ-режим.\nОтправь номер телефона клиента, которого хочешь найти/создать.",
    )
    .await?;
    deps.sessions.set(user_id, Session::AdminAwaitingPhone);
    Ok(())
}

/// Routes free text arriving in one of the admin states.
pub async fn handle_admin_text(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    text: &str,
    session: Session,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    match session {
        Session::AdminAwaitingPhone => handle_phone_entry(bot, chat_id, user_id, text, deps).await,
        Session::AdminAwaitingPurchaseAmount { phone } => {
            handle_purchase_amount(bot, chat_id, user_id, &phone, text, deps).await
        }
        Session::AdminAwaitingRedeemAmount { phone } => {
            handle_redeem_amount(bot, chat_id, user_id, &phone, text, deps).await
        }
        Session::AdminMenu { .. } => {
            // Only the menu buttons advance from here
            bot.send_message(chat_id, "Выбери действие кнопками выше.").await?;
            Ok(())
        }
        // Not an admin state; nothing to do
        Session::Idle | Session::AwaitingPhone => Ok(()),
    }
}

async fn handle_phone_entry(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    text: &str,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    let phone = text.trim();

    match deps.ledger.lookup_or_create(phone, "").await {
        Ok(customer) => {
            bot.send_message(chat_id, render_customer_card(&customer))
                .reply_markup(admin_menu_keyboard())
                .await?;
            deps.sessions.set(
                user_id,
                Session::AdminMenu {
                    phone: phone.to_string(),
                },
            );
        }
        Err(e) => {
            log::error!("Admin phone entry failed for {}: {}", phone, e);
            bot.send_message(chat_id, STORE_DOWN_REPLY).await?;
        }
    }
    Ok(())
}

async fn handle_purchase_amount(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    phone: &str,
    text: &str,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    match deps.ledger.record_purchase(phone, text).await {
        Ok(receipt) => {
            bot.send_message(
                chat_id,
                format!(
                    "Покупка на {}₽.\nНачислено бонусов: {}.\nНовый баланс: {}.",
                    receipt.amount, receipt.bonus_delta, receipt.new_balance
                ),
            )
            .await?;
            deps.sessions.set(
                user_id,
                Session::AdminMenu {
                    phone: phone.to_string(),
                },
            );
        }
        Err(AppError::InvalidAmount(_)) => {
            bot.send_message(chat_id, "Неверная сумма, попробуй ещё раз.").await?;
        }
        Err(AppError::CustomerNotFound(_)) => {
            bot.send_message(chat_id, "Клиент не найден. Отправь номер телефона ещё раз.")
                .await?;
            deps.sessions.set(user_id, Session::AdminAwaitingPhone);
        }
        Err(e) => {
            log::error!("Purchase failed for {}: {}", phone, e);
            bot.send_message(chat_id, STORE_DOWN_REPLY).await?;
        }
    }
    Ok(())
}

async fn handle_redeem_amount(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    phone: &str,
    text: &str,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    match deps.ledger.redeem(phone, text).await {
        Ok(receipt) => {
            bot.send_message(
                chat_id,
                format!(
                    "Списано бонусов: {}.\nНовый баланс: {}.",
                    receipt.redeemed, receipt.new_balance
                ),
            )
            .await?;
            deps.sessions.set(
                user_id,
                Session::AdminMenu {
                    phone: phone.to_string(),
                },
            );
        }
        Err(AppError::InvalidAmount(_)) => {
            bot.send_message(chat_id, "Неверное число, попробуй ещё раз.").await?;
        }
        Err(AppError::InsufficientBalance { balance }) => {
            bot.send_message(chat_id, format!("Недостаточно бонусов. Текущий баланс: {}.", balance))
                .await?;
        }
        Err(AppError::CustomerNotFound(_)) => {
            bot.send_message(chat_id, "Клиент не найден. Отправь номер телефона ещё раз.")
                .await?;
            deps.sessions.set(user_id, Session::AdminAwaitingPhone);
        }
        Err(e) => {
            log::error!("Redeem failed for {}: {}", phone, e);
            bot.send_message(chat_id, STORE_DOWN_REPLY).await?;
        }
    }
    Ok(())
}

/// Handles the purchase/redeem menu buttons.
///
/// Pressing a button without a selected customer (the session no longer
/// carries a phone, e.g. after a restart) expires the flow and returns the
/// admin to phone entry.
pub async fn handle_admin_callback(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    data: &str,
    deps: &HandlerDeps,
) -> Result<(), teloxide::RequestError> {
    if !is_admin(user_id) {
        bot.send_message(chat_id, ACCESS_DENIED_REPLY).await?;
        return Ok(());
    }

    let Some(action) = menu_action_for(data) else {
        return Ok(());
    };

    let session = deps.sessions.get(user_id);
    let phone = match session.require_admin_phone() {
        Ok(phone) => phone.to_string(),
        Err(e) => {
            log::warn!("Admin {} pressed {}: {}", user_id, data, e);
            bot.send_message(chat_id, SESSION_EXPIRED_REPLY).await?;
            deps.sessions.set(user_id, Session::AdminAwaitingPhone);
            return Ok(());
        }
    };

    match action {
        MenuAction::Purchase => {
            bot.send_message(chat_id, "Введи сумму покупки (в рублях):").await?;
            deps.sessions.set(user_id, Session::AdminAwaitingPurchaseAmount { phone });
        }
        MenuAction::Redeem => {
            bot.send_message(chat_id, "Введи, сколько бонусов списать:").await?;
            deps.sessions.set(user_id, Session::AdminAwaitingRedeemAmount { phone });
        }
    }
    Ok(())
}
