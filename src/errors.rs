use std::fmt;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::gate::ActionName;

/// Classification attached to every failed remote call by the ledger binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallErrorKind {
    /// The user declined to sign the transaction
    UserRejected,
    /// The program rejected the transaction
    Reverted,
    /// Transport-level failure (connection, timeout, HTTP)
    Network,
    /// The ledger returned data that could not be decoded
    InvalidData,
    Other,
}

impl fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::UserRejected => "user rejected",
            Self::Reverted => "reverted",
            Self::Network => "network error",
            Self::InvalidData => "invalid data",
            Self::Other => "error",
        };
        f.write_str(label)
    }
}

/// Error returned by a `LockApi` capability call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CallError {
    pub kind: CallErrorKind,
    pub message: String,
}

impl CallError {
    pub fn new(kind: CallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::UserRejected, message)
    }

    pub fn reverted(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Reverted, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Network, message)
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::InvalidData, message)
    }

    /// Map a wallet-provider JSON-RPC error code onto a kind.
    ///
    /// 4001 is the provider code for a rejected signature request.
    pub fn from_rpc_code(code: i64, message: impl Into<String>) -> Self {
        let kind = match code {
            4001 => CallErrorKind::UserRejected,
            -32099..=-32000 => CallErrorKind::Reverted,
            _ => CallErrorKind::Other,
        };
        Self::new(kind, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.kind == CallErrorKind::UserRejected
    }
}

/// Outcome recorded in `TxState::error` when a guarded action fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxFailure {
    #[error("{action} cancelled by user")]
    UserCancelled {
        action: ActionName,
        #[source]
        source: CallError,
    },

    #[error("{action} failed: {source}")]
    RemoteCallFailure {
        action: ActionName,
        #[source]
        source: CallError,
    },
}

impl TxFailure {
    pub fn classify(action: ActionName, source: CallError) -> Self {
        if source.is_user_rejection() {
            Self::UserCancelled { action, source }
        } else {
            Self::RemoteCallFailure { action, source }
        }
    }

    pub fn action(&self) -> ActionName {
        match self {
            Self::UserCancelled { action, .. } | Self::RemoteCallFailure { action, .. } => *action,
        }
    }

    pub fn call_error(&self) -> &CallError {
        match self {
            Self::UserCancelled { source, .. } | Self::RemoteCallFailure { source, .. } => source,
        }
    }

    /// Whether the presentation should fill its error slot with this failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::RemoteCallFailure { .. })
    }
}

/// A balance read that failed during a refresh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch balances for {account}: {source}")]
pub struct FetchFailure {
    pub account: Pubkey,
    #[source]
    pub source: CallError,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Wallet not found. Run 'tokenlock wallet create' first")]
    WalletNotFound,

    #[error("Invalid cluster name: {0}. Valid options: devnet, mainnet-beta, localnet")]
    InvalidCluster(String),

    #[error("Invalid account address: {0}")]
    InvalidAccount(String),

    #[error("Nothing to lock: wallet holds no transferable tokens")]
    NothingToLock,

    #[error("Cannot {action} right now: {reason}")]
    ActionUnavailable { action: ActionName, reason: String },

    #[error("Another transaction is still pending")]
    TransactionPending,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
