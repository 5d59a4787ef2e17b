//! Dispatcher schema and handler chain builders

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use crate::loyalty::Ledger;
use crate::store::RecordStore;
use crate::telegram::bot::Command;
use crate::telegram::cabinet;
use crate::telegram::session::{Session, SessionStore};
use crate::telegram::{admin, cabinet::start_keyboard};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub store: Arc<dyn RecordStore>,
    pub ledger: Arc<Ledger>,
    pub sessions: Arc<SessionStore>,
}

impl HandlerDeps {
    /// Create handler dependencies around one record store instance.
    ///
    /// The process owns a single store for its lifetime; tests inject a
    /// `MemoryStore` through the same constructor.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            ledger: Arc::new(Ledger::new(Arc::clone(&store))),
            sessions: Arc::new(SessionStore::new()),
            store,
        }
    }
}

/// Creates the main dispatcher schema for the Telegram bot.
///
/// This function returns a handler tree that can be used with teloxide's
/// Dispatcher. The same schema is used in production and in tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        // Command handler
        .branch(command_handler(deps_commands))
        // Free-text handler, routed by the user's session
        .branch(message_handler(deps_messages))
        // Callback query handler (inline keyboard buttons)
        .branch(callback_handler(deps_callback))
}

fn user_id_of(msg: &Message) -> i64 {
    msg.from.as_ref().and_then(|u| i64::try_from(u.id.0).ok()).unwrap_or(0)
}

/// Handler for bot commands (/start, /admin)
fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                let user_id = user_id_of(&msg);

                match cmd {
                    Command::Start => {
                        handle_start_command(&bot, &msg).await?;
                    }
                    Command::Admin => {
                        admin::handle_admin_command(&bot, msg.chat.id, user_id, &deps).await?;
                    }
                }
                Ok(())
            }
        },
    ))
}

/// Handler for /start: greeting plus the cabinet button
async fn handle_start_command(bot: &Bot, msg: &Message) -> Result<(), teloxide::RequestError> {
    bot.send_message(
        msg.chat.id,
        "Привет! Это бот системы лояльности фото-ателье.\nНажми кнопку, чтобы открыть личный кабинет.",
    )
    .reply_markup(start_keyboard())
    .await?;
    Ok(())
}

/// Handler for free text, interpreted against the sender's session
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move {
            let Some(text) = msg.text() else { return Ok(()) };
            // Commands (including unknown ones) never reach the session router
            if text.starts_with('/') {
                return Ok(());
            }

            let user_id = user_id_of(&msg);
            let full_name = msg.from.as_ref().map(|u| u.full_name()).unwrap_or_default();

            match deps.sessions.get(user_id) {
                Session::AwaitingPhone => {
                    cabinet::handle_phone_input(&bot, msg.chat.id, user_id, &full_name, text, &deps).await?;
                }
                session @ (Session::AdminAwaitingPhone
                | Session::AdminMenu { .. }
                | Session::AdminAwaitingPurchaseAmount { .. }
                | Session::AdminAwaitingRedeemAmount { .. })
                    if admin::is_admin(user_id) =>
                {
                    admin::handle_admin_text(&bot, msg.chat.id, user_id, text, session, &deps).await?;
                }
                _ => {
                    bot.send_message(
                        msg.chat.id,
                        "Нажми /start и кнопку «Личный кабинет», чтобы посмотреть бонусы.",
                    )
                    .await?;
                }
            }
            Ok(())
        }
    })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            let Some(data) = q.data.clone() else { return Ok(()) };
            let user_id = i64::try_from(q.from.id.0).unwrap_or(0);

            // Stop the button spinner before doing any store work
            let _ = bot.answer_callback_query(q.id.clone()).await;

            let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
                return Ok(());
            };

            match data.as_str() {
                cabinet::CABINET_OPEN => {
                    cabinet::handle_cabinet_open(&bot, chat_id, user_id, &deps).await?;
                }
                admin::ADMIN_PURCHASE | admin::ADMIN_REDEEM => {
                    admin::handle_admin_callback(&bot, chat_id, user_id, &data, &deps).await?;
                }
                other => {
                    log::warn!("Unknown callback payload from user {}: {}", user_id, other);
                }
            }
            Ok(())
        }
    })
}
