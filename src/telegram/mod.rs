//! Telegram bot integration and handlers

pub mod admin;
pub mod bot;
pub mod cabinet;
pub mod handlers;
pub mod session;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use session::{Session, SessionStore};
