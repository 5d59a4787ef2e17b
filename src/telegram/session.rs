//! Per-user conversation state
//!
//! Each Telegram user has one [`Session`] that decides what the next free
//! text message means. The admin's selected customer phone lives only inside
//! the admin sub-states, so an amount handler can never see a half-filled
//! session. State is in-memory only and is lost on restart; a user parked
//! mid-flow simply starts over.

use dashmap::DashMap;

use crate::core::error::AppError;

/// Conversation state for one Telegram user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Nothing pending; free text gets the help reply
    #[default]
    Idle,
    /// Customer pressed the cabinet button and owes us a phone number
    AwaitingPhone,
    /// Admin entered admin mode and owes us a customer phone
    AdminAwaitingPhone,
    /// Admin has a customer selected and is choosing an action
    AdminMenu { phone: String },
    /// Admin chose "purchase" and owes us the amount
    AdminAwaitingPurchaseAmount { phone: String },
    /// Admin chose "redeem" and owes us the amount
    AdminAwaitingRedeemAmount { phone: String },
}

impl Session {
    /// The admin's selected customer phone, if this state carries one.
    pub fn admin_phone(&self) -> Option<&str> {
        match self {
            Session::AdminMenu { phone }
            | Session::AdminAwaitingPurchaseAmount { phone }
            | Session::AdminAwaitingRedeemAmount { phone } => Some(phone),
            _ => None,
        }
    }

    /// Like [`Session::admin_phone`], but a missing selection is an error.
    /// Happens when a stale menu button is pressed after a restart.
    pub fn require_admin_phone(&self) -> Result<&str, AppError> {
        self.admin_phone().ok_or(AppError::SessionExpired)
    }
}

/// Concurrent map of user ID to session, created lazily per user.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<i64, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session for a user; `Idle` until something is stored.
    pub fn get(&self, user_id: i64) -> Session {
        self.sessions.get(&user_id).map(|s| s.clone()).unwrap_or_default()
    }

    /// Replaces the user's session.
    pub fn set(&self, user_id: i64, session: Session) {
        self.sessions.insert(user_id, session);
    }

    /// Back to idle.
    pub fn reset(&self, user_id: i64) {
        self.sessions.insert(user_id, Session::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_is_idle() {
        let store = SessionStore::new();
        assert_eq!(store.get(42), Session::Idle);
    }

    #[test]
    fn test_set_overwrites_previous_state() {
        let store = SessionStore::new();
        store.set(42, Session::AdminAwaitingPhone);
        store.set(
            42,
            Session::AdminMenu {
                phone: "+79001234567".to_string(),
            },
        );
        assert_eq!(
            store.get(42),
            Session::AdminMenu {
                phone: "+79001234567".to_string()
            }
        );
    }

    #[test]
    fn test_admin_phone_only_in_admin_substates() {
        assert_eq!(Session::Idle.admin_phone(), None);
        assert_eq!(Session::AwaitingPhone.admin_phone(), None);
        assert_eq!(Session::AdminAwaitingPhone.admin_phone(), None);
        assert_eq!(
            Session::AdminAwaitingRedeemAmount {
                phone: "+7900".to_string()
            }
            .admin_phone(),
            Some("+7900")
        );
    }

    #[test]
    fn test_require_admin_phone_expires_without_selection() {
        let err = Session::AdminAwaitingPhone.require_admin_phone().unwrap_err();
        assert!(matches!(err, AppError::SessionExpired));

        let menu = Session::AdminMenu {
            phone: "+79001234567".to_string(),
        };
        assert_eq!(menu.require_admin_phone().unwrap(), "+79001234567");
    }

    #[test]
    fn test_sessions_are_per_user() {
        let store = SessionStore::new();
        store.set(1, Session::AwaitingPhone);
        assert_eq!(store.get(1), Session::AwaitingPhone);
        assert_eq!(store.get(2), Session::Idle);
    }
}
