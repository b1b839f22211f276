use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::balances::{Amount, BalanceSnapshot};
use crate::errors::CallError;

/// Context handed to every mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    /// Account the transaction is sent from
    pub from: Pubkey,
}

/// Proof that a mutating call landed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction signature or hash
    pub signature: String,
}

impl Receipt {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }
}

/// Ledger capabilities the session engine drives.
///
/// Implementations own the wire protocol and signing. They report failures
/// with a classified `CallError`, which is all the engine inspects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LockApi: Send + Sync {
    /// Move `amount` transferable tokens into the vault.
    async fn lock(&self, amount: Amount, ctx: TxContext) -> Result<Receipt, CallError>;

    /// Start (or restart) the waiting period for the entire locked amount.
    async fn unlock(&self, ctx: TxContext) -> Result<Receipt, CallError>;

    /// Withdraw the matured unlocked amount back to the wallet.
    async fn withdraw_unlocked(&self, ctx: TxContext) -> Result<Receipt, CallError>;

    async fn fetch_balances(&self, account: Pubkey) -> Result<BalanceSnapshot, CallError>;

    /// Transferable wallet balance that a lock would move.
    ///
    /// Bindings that cannot see the wallet return `Ok(None)`, which keeps
    /// locking disabled.
    async fn fetch_wallet_balance(&self, _account: Pubkey) -> Result<Option<Amount>, CallError> {
        Ok(None)
    }
}
