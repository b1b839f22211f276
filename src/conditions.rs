//! Permission derivation for the lock / unlock / withdraw controls.

use crate::balances::{Amount, BalanceSnapshot, Timestamp};

/// Which controls are currently allowed for the acting account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conditions {
    pub can_lock: bool,
    pub can_unlock: bool,
    pub can_withdraw: bool,
    /// An unlock is already counting down; unlocking again restarts it.
    pub can_re_unlock: bool,
}

impl Conditions {
    pub const ALL_DISABLED: Self = Self {
        can_lock: false,
        can_unlock: false,
        can_withdraw: false,
        can_re_unlock: false,
    };
}

/// Derive permissions from a snapshot, the transferable wallet balance and
/// the current time.
///
/// Unknown values never grant a permission.
pub fn derive_conditions(
    balances: &BalanceSnapshot,
    wallet_balance: Option<Amount>,
    now: Timestamp,
) -> Conditions {
    let matured = balances.unlock_maturity.map(|maturity| now >= maturity);

    Conditions {
        can_lock: is_positive(wallet_balance),
        can_unlock: is_positive(balances.locked),
        can_withdraw: is_positive(balances.unlocked) && matured == Some(true),
        can_re_unlock: is_positive(balances.unlocking) && matured == Some(false),
    }
}

fn is_positive(amount: Option<Amount>) -> bool {
    matches!(amount, Some(value) if value > 0)
}
