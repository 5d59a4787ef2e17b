//! Customer ledger
//!
//! Turnover, bonus balance and tier arithmetic over the record store. Every
//! mutation is a read-modify-write of a single customer row plus an appended
//! audit transaction; the store offers no transactions, so concurrent
//! operations on the same phone can race (see the store module docs).

use std::sync::Arc;

use crate::core::error::{AppError, AppResult};
use crate::loyalty::model::{Customer, TransactionRecord, TxKind};
use crate::loyalty::tier::{tier_of, Tier};
use crate::store::RecordStore;

/// Result of a recorded purchase, for display to the admin.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub amount: f64,
    pub bonus_delta: f64,
    pub new_balance: f64,
    pub new_turnover: f64,
    pub tier: Tier,
}

/// Result of a bonus redemption.
#[derive(Debug, Clone, PartialEq)]
pub struct RedeemReceipt {
    pub redeemed: f64,
    pub new_balance: f64,
}

/// Parses user-entered money text: comma or dot decimal separator,
/// non-negative, finite.
pub fn parse_amount(text: &str) -> AppResult<f64> {
    let normalized = text.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(AppError::InvalidAmount(text.to_string())),
    }
}

/// Bonus points for a purchase: amount times the accrual rate, rounded to
/// the nearest whole point, ties away from zero (`f64::round`).
pub fn bonus_for_purchase(amount: f64, tier: Tier) -> f64 {
    (amount * tier.accrual_rate()).round()
}

/// Entity lifecycle and arithmetic for loyalty customers.
pub struct Ledger {
    store: Arc<dyn RecordStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Returns the existing customer for `phone` or creates a fresh one.
    ///
    /// Idempotent: a repeat call refreshes the display name (when the caller
    /// supplies a non-empty one) and reconciles the stored tier, but never
    /// touches turnover or balance.
    pub async fn lookup_or_create(&self, phone: &str, display_name: &str) -> AppResult<Customer> {
        let phone = phone.trim();
        match self.store.find_customer(phone).await? {
            Some(mut customer) => {
                let mut dirty = false;
                if !display_name.is_empty() && customer.name != display_name {
                    customer.name = display_name.to_string();
                    dirty = true;
                }
                // Tier is denormalized; recompute before it is ever shown
                let expected = tier_of(customer.turnover);
                if customer.tier != expected {
                    log::info!(
                        "Reconciling tier for {}: {} -> {}",
                        customer.phone,
                        customer.tier,
                        expected
                    );
                    customer.tier = expected;
                    dirty = true;
                }
                if dirty {
                    self.store.update_customer(&customer).await?;
                }
                Ok(customer)
            }
            None => {
                let customer = Customer::new(phone, display_name);
                self.store.insert_customer(&customer).await?;
                log::info!("Created customer {}", customer.phone);
                Ok(customer)
            }
        }
    }

    /// Records a purchase: bumps turnover, re-tiers from the new turnover,
    /// accrues bonus points at the new tier's rate and logs the transaction.
    pub async fn record_purchase(&self, phone: &str, raw_amount: &str) -> AppResult<PurchaseReceipt> {
        let amount = parse_amount(raw_amount)?;
        let mut customer = self
            .store
            .find_customer(phone)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(phone.to_string()))?;

        customer.turnover += amount;
        customer.tier = tier_of(customer.turnover);
        let bonus_delta = bonus_for_purchase(amount, customer.tier);
        customer.bonus_balance += bonus_delta;

        self.store.update_customer(&customer).await?;
        self.store
            .append_transaction(&TransactionRecord::new(
                &customer.phone,
                TxKind::Purchase,
                amount,
                bonus_delta,
                "Покупка в ателье",
            ))
            .await?;

        log::info!(
            "Purchase {} for {}: +{} bonus, balance {}, turnover {} ({})",
            amount,
            customer.phone,
            bonus_delta,
            customer.bonus_balance,
            customer.turnover,
            customer.tier
        );

        Ok(PurchaseReceipt {
            amount,
            bonus_delta,
            new_balance: customer.bonus_balance,
            new_turnover: customer.turnover,
            tier: customer.tier,
        })
    }

    /// Redeems bonus points. Balance never goes below zero; turnover and
    /// tier are unaffected.
    pub async fn redeem(&self, phone: &str, raw_amount: &str) -> AppResult<RedeemReceipt> {
        let amount = parse_amount(raw_amount)?;
        let mut customer = self
            .store
            .find_customer(phone)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(phone.to_string()))?;

        if amount > customer.bonus_balance {
            return Err(AppError::InsufficientBalance {
                balance: customer.bonus_balance,
            });
        }

        customer.bonus_balance -= amount;

        self.store.update_customer(&customer).await?;
        self.store
            .append_transaction(&TransactionRecord::new(
                &customer.phone,
                TxKind::Redeem,
                0.0,
                -amount,
                "Списание бонусов",
            ))
            .await?;

        log::info!(
            "Redeemed {} for {}: balance {}",
            amount,
            customer.phone,
            customer.bonus_balance
        );

        Ok(RedeemReceipt {
            redeemed: amount,
            new_balance: customer.bonus_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    fn ledger_with_store() -> (Ledger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Ledger::new(store.clone()), store)
    }

    #[test]
    fn test_parse_amount_separators() {
        assert_eq!(parse_amount("450").unwrap(), 450.0);
        assert_eq!(parse_amount("99,50").unwrap(), 99.5);
        assert_eq!(parse_amount(" 12.25 ").unwrap(), 12.25);
    }

    #[test]
    fn test_parse_amount_rejects_garbage_and_negatives() {
        assert!(matches!(parse_amount("abc"), Err(AppError::InvalidAmount(_))));
        assert!(matches!(parse_amount("-5"), Err(AppError::InvalidAmount(_))));
        assert!(matches!(parse_amount(""), Err(AppError::InvalidAmount(_))));
        assert!(matches!(parse_amount("nan"), Err(AppError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_lookup_or_create_is_idempotent() {
        let (ledger, store) = ledger_with_store();

        let first = ledger.lookup_or_create("+79001234567", "Анна").await.unwrap();
        assert_eq!(first.turnover, 0.0);
        assert_eq!(first.tier, Tier::Base);

        // Second call with a different name: one record, fresh name,
        // monetary fields untouched
        let second = ledger.lookup_or_create("+79001234567", "Анна П.").await.unwrap();
        assert_eq!(store.customer_count(), 1);
        assert_eq!(second.name, "Анна П.");
        assert_eq!(second.turnover, 0.0);
        assert_eq!(second.bonus_balance, 0.0);
    }

    #[tokio::test]
    async fn test_purchase_crossing_silver_threshold() {
        let (ledger, store) = ledger_with_store();
        ledger.lookup_or_create("+79001234567", "Анна").await.unwrap();

        // Seed prior turnover of 9800 at base tier
        let mut customer = store.find_customer("+79001234567").await.unwrap().unwrap();
        customer.turnover = 9800.0;
        store.update_customer(&customer).await.unwrap();

        // 9800 + 450 = 10250 -> silver, 450 * 0.07 = 31.5 -> 32
        let receipt = ledger.record_purchase("+79001234567", "450").await.unwrap();
        assert_eq!(receipt.new_turnover, 10250.0);
        assert_eq!(receipt.tier, Tier::Silver);
        assert_eq!(receipt.bonus_delta, 32.0);
        assert_eq!(receipt.new_balance, 32.0);

        let txs = store.transactions();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].kind, TxKind::Purchase);
        assert_eq!(txs[0].bonus_delta, 32.0);
    }

    #[tokio::test]
    async fn test_redeem_never_drives_balance_negative() {
        let (ledger, store) = ledger_with_store();
        ledger.lookup_or_create("+79001234567", "Анна").await.unwrap();
        ledger.record_purchase("+79001234567", "1000").await.unwrap(); // +50 bonus

        let err = ledger.redeem("+79001234567", "60").await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance { balance } if balance == 50.0));

        // Rejected redeem leaves the balance unchanged and logs nothing
        let customer = store.find_customer("+79001234567").await.unwrap().unwrap();
        assert_eq!(customer.bonus_balance, 50.0);
        assert_eq!(store.transaction_count(), 1);

        let receipt = ledger.redeem("+79001234567", "50").await.unwrap();
        assert_eq!(receipt.new_balance, 0.0);
    }

    #[tokio::test]
    async fn test_redeem_does_not_touch_turnover_or_tier() {
        let (ledger, store) = ledger_with_store();
        ledger.lookup_or_create("+79001234567", "Анна").await.unwrap();
        ledger.record_purchase("+79001234567", "30000").await.unwrap();

        let before = store.find_customer("+79001234567").await.unwrap().unwrap();
        assert_eq!(before.tier, Tier::Gold);

        ledger.redeem("+79001234567", "100").await.unwrap();
        let after = store.find_customer("+79001234567").await.unwrap().unwrap();
        assert_eq!(after.turnover, before.turnover);
        assert_eq!(after.tier, Tier::Gold);
    }

    #[tokio::test]
    async fn test_turnover_is_monotonic_across_operations() {
        let (ledger, store) = ledger_with_store();
        ledger.lookup_or_create("+79001234567", "Анна").await.unwrap();

        let mut last_turnover = 0.0;
        for raw in ["100", "2500,50", "0", "7399.5"] {
            ledger.record_purchase("+79001234567", raw).await.unwrap();
            let customer = store.find_customer("+79001234567").await.unwrap().unwrap();
            assert!(customer.turnover >= last_turnover);
            last_turnover = customer.turnover;
        }
        let _ = ledger.redeem("+79001234567", "10").await.unwrap();
        let customer = store.find_customer("+79001234567").await.unwrap().unwrap();
        assert_eq!(customer.turnover, last_turnover);
    }

    #[tokio::test]
    async fn test_stale_tier_is_reconciled_on_load() {
        let (ledger, store) = ledger_with_store();

        // Simulate a row edited by hand in the workbook: turnover says gold,
        // level cell still says base
        let mut customer = Customer::new("+79001234567", "Анна");
        customer.turnover = 45_000.0;
        store.insert_customer(&customer).await.unwrap();

        let loaded = ledger.lookup_or_create("+79001234567", "").await.unwrap();
        assert_eq!(loaded.tier, Tier::Gold);
        let persisted = store.find_customer("+79001234567").await.unwrap().unwrap();
        assert_eq!(persisted.tier, Tier::Gold);
    }

    #[tokio::test]
    async fn test_purchase_for_unknown_phone_fails() {
        let (ledger, _store) = ledger_with_store();
        let err = ledger.record_purchase("+70000000000", "100").await.unwrap_err();
        assert!(matches!(err, AppError::CustomerNotFound(_)));
    }
}
