//! Record types stored in the loyalty workbook

use chrono::Utc;

use super::tier::Tier;

/// Timestamp format used across all three sheets (UTC, seconds precision).
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// A loyalty customer, one row of the `clients` sheet.
///
/// The phone number is the natural key and is stored exactly as the user
/// entered it; differently formatted numbers are different customers.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub phone: String,
    pub name: String,
    pub created_at: String,
    pub turnover: f64,
    pub bonus_balance: f64,
    pub tier: Tier,
}

impl Customer {
    /// Fresh customer with zero turnover and balance.
    pub fn new(phone: &str, name: &str) -> Self {
        Self {
            phone: phone.to_string(),
            name: name.to_string(),
            created_at: now_timestamp(),
            turnover: 0.0,
            bonus_balance: 0.0,
            tier: Tier::Base,
        }
    }
}

/// Transaction kind for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Purchase,
    Redeem,
}

impl TxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TxKind::Purchase => "purchase",
            TxKind::Redeem => "redeem",
        }
    }
}

/// Append-only audit row in the `transactions` sheet.
///
/// Written once, never mutated and never read back by the bot.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub phone: String,
    pub kind: TxKind,
    pub amount: f64,
    pub bonus_delta: f64,
    pub at: String,
    pub comment: String,
}

impl TransactionRecord {
    pub fn new(phone: &str, kind: TxKind, amount: f64, bonus_delta: f64, comment: &str) -> Self {
        Self {
            phone: phone.to_string(),
            kind,
            amount,
            bonus_delta,
            at: now_timestamp(),
            comment: comment.to_string(),
        }
    }
}

/// Telegram-user-to-phone association, one row of the `links` sheet.
///
/// At most one phone per Telegram ID; re-linking updates the existing row
/// (last write wins).
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityLink {
    pub telegram_id: i64,
    pub phone: String,
    pub display_name: String,
    pub linked_at: String,
}

impl IdentityLink {
    pub fn new(telegram_id: i64, phone: &str, display_name: &str) -> Self {
        Self {
            telegram_id,
            phone: phone.to_string(),
            display_name: display_name.to_string(),
            linked_at: now_timestamp(),
        }
    }
}
