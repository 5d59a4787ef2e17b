//! Loyalty domain: tiering policy, record types, customer ledger

pub mod ledger;
pub mod model;
pub mod tier;

pub use ledger::{parse_amount, Ledger, PurchaseReceipt, RedeemReceipt};
pub use model::{Customer, IdentityLink, TransactionRecord, TxKind};
pub use tier::{tier_of, Tier};
