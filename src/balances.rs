use chrono::{DateTime, Duration, Utc};

/// Token quantity in base units.
pub type Amount = u64;

/// Point in time used for maturity checks and the session clock.
pub type Timestamp = DateTime<Utc>;

/// Number of base units per whole token.
pub const TOKEN_DECIMALS: u32 = 9;

/// Vault balances of one account.
///
/// Every field is `None` until the first successful fetch. Unknown is not
/// the same as zero, and readers must treat it as "nothing available".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceSnapshot {
    pub locked: Option<Amount>,
    pub unlocking: Option<Amount>,
    pub unlocked: Option<Amount>,
    pub unlock_maturity: Option<Timestamp>,
}

impl BalanceSnapshot {
    /// The all-unknown snapshot.
    pub const UNKNOWN: Self = Self {
        locked: None,
        unlocking: None,
        unlocked: None,
        unlock_maturity: None,
    };

    pub fn known(
        locked: Amount,
        unlocking: Amount,
        unlocked: Amount,
        unlock_maturity: Option<Timestamp>,
    ) -> Self {
        Self {
            locked: Some(locked),
            unlocking: Some(unlocking),
            unlocked: Some(unlocked),
            unlock_maturity,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Remaining waiting time before the pending unlock matures.
    ///
    /// Zero once matured, `None` when no maturity is known.
    pub fn time_until_maturity(&self, now: Timestamp) -> Option<Duration> {
        let maturity = self.unlock_maturity?;
        if now >= maturity {
            Some(Duration::zero())
        } else {
            Some(maturity - now)
        }
    }
}

/// Format base units as whole tokens with two decimals.
pub fn format_tokens(amount: Amount) -> String {
    let tokens = amount as f64 / 10u64.pow(TOKEN_DECIMALS) as f64;
    format!("{:.2}", tokens)
}

/// Format an optional amount, rendering unknown as a dash.
pub fn format_optional_tokens(amount: Option<Amount>) -> String {
    amount.map(format_tokens).unwrap_or_else(|| "-".to_string())
}

/// Human-readable countdown, e.g. `1d 03h 12m 09s`.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}d {:02}h {:02}m {:02}s", days, hours, minutes, seconds)
    } else {
        format!("{:02}h {:02}m {:02}s", hours, minutes, seconds)
    }
}
