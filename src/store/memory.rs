//! In-memory implementation of the record store
//!
//! Used by unit and integration tests, and handy for poking at the bot
//! without a real workbook. Behaves like the Sheets store: upserts by
//! natural key, append-only transaction log, no concurrency control beyond
//! the mutex that keeps single operations atomic.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{RecordStore, StoreError};
use crate::loyalty::model::{Customer, IdentityLink, TransactionRecord};

#[derive(Default)]
struct Inner {
    customers: Vec<Customer>,
    transactions: Vec<TransactionRecord>,
    links: Vec<IdentityLink>,
}

/// Record store over plain vectors behind a mutex.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in the transaction log.
    pub fn transaction_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.transactions.len()).unwrap_or(0)
    }

    /// Number of customer rows.
    pub fn customer_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.customers.len()).unwrap_or(0)
    }

    /// Snapshot of the transaction log, oldest first.
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.inner.lock().map(|inner| inner.transactions.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        // A poisoned mutex means a test panicked mid-operation; surface it
        // as an unavailable store rather than panicking again.
        self.inner.lock().map_err(|_| StoreError::NotConfigured)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ensure_tables(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_customer(&self, phone: &str) -> Result<Option<Customer>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.customers.iter().find(|c| c.phone.trim() == phone.trim()).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.customers.push(customer.clone());
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.customers.iter_mut().find(|c| c.phone.trim() == customer.phone.trim()) {
            Some(existing) => *existing = customer.clone(),
            None => inner.customers.push(customer.clone()),
        }
        Ok(())
    }

    async fn append_transaction(&self, tx: &TransactionRecord) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.transactions.push(tx.clone());
        Ok(())
    }

    async fn find_link(&self, telegram_id: i64) -> Result<Option<IdentityLink>, StoreError> {
        let inner = self.lock()?;
        Ok(inner.links.iter().find(|l| l.telegram_id == telegram_id).cloned())
    }

    async fn upsert_link(&self, link: &IdentityLink) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.links.iter_mut().find(|l| l.telegram_id == link.telegram_id) {
            Some(existing) => *existing = link.clone(),
            None => inner.links.push(link.clone()),
        }
        Ok(())
    }
}
