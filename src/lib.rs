//! Fotobonus: Telegram loyalty-program bot for a photo atelier
//!
//! Links Telegram users to phone-number identities, tracks turnover, awards
//! and redeems bonus points and tiers customers into discount levels. State
//! lives in a Google Sheets workbook used as a row-oriented record store.

pub mod cli;
pub mod core;
pub mod loyalty;
pub mod store;
pub mod telegram;

pub use crate::core::error::{AppError, AppResult};
