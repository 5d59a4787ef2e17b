//! Record store adapter
//!
//! The loyalty state lives in an external spreadsheet-like service with
//! three logical tables: `clients`, `transactions` and `links`. This module
//! hides the table-scanning strategy behind key-based find/update
//! operations, so the ledger and the conversation handlers never see row
//! indices. A future indexed backend only has to implement [`RecordStore`].
//!
//! There is no locking, no transactions and no optimistic concurrency
//! control: two concurrent purchases for the same phone perform separate
//! read and write calls and can lose an update. That matches the nature of
//! the backing store and is preserved on purpose.

pub mod memory;
pub mod sheets;

pub use memory::MemoryStore;
pub use sheets::SheetsStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::loyalty::model::{Customer, IdentityLink, TransactionRecord};

/// Errors from the record store adapter
#[derive(Error, Debug)]
pub enum StoreError {
    /// Spreadsheet ID or API token missing from the environment
    #[error("Record store is not configured (GSSHEETID / GSHEETS_TOKEN)")]
    NotConfigured,

    /// Transport-level HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Sheets API rejected the request
    #[error("Sheets API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Key-based operations over the three loyalty tables.
///
/// Implementations scan however they like; callers address rows by natural
/// key only (phone for customers, Telegram ID for identity links).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Makes sure each table exists with its fixed header row.
    async fn ensure_tables(&self) -> Result<(), StoreError>;

    /// Finds a customer by phone (exact match after trimming).
    async fn find_customer(&self, phone: &str) -> Result<Option<Customer>, StoreError>;

    /// Appends a new customer row.
    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError>;

    /// Rewrites the row of an existing customer, addressed by phone.
    /// A customer that vanished between read and write is appended instead.
    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError>;

    /// Appends a row to the append-only transaction log.
    async fn append_transaction(&self, tx: &TransactionRecord) -> Result<(), StoreError>;

    /// Finds the phone linked to a Telegram user, if any.
    async fn find_link(&self, telegram_id: i64) -> Result<Option<IdentityLink>, StoreError>;

    /// Creates or overwrites the link row for a Telegram user (last write wins).
    async fn upsert_link(&self, link: &IdentityLink) -> Result<(), StoreError>;
}
