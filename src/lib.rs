//! Client-side engine for time-locked token positions.
//!
//! The engine derives lock / unlock / withdraw permissions from vault
//! balances, runs mutating calls through a single-flight gate, and keeps
//! the acting account and an optional second account in sync after every
//! action or clock tick. Ledger access goes through the [`LockApi`]
//! capability; [`contracts::SolanaLockApi`] binds it to a Solana program.

pub mod api;
pub mod balances;
pub mod conditions;
pub mod config;
pub mod contracts;
pub mod errors;
pub mod gate;
pub mod lock_utils;
pub mod session;
pub mod wallet;

pub use api::{LockApi, Receipt, TxContext};
pub use balances::{Amount, BalanceSnapshot, Timestamp};
pub use conditions::{derive_conditions, Conditions};
pub use errors::{CallError, CallErrorKind, FetchFailure, TxFailure};
pub use gate::{ActionName, FailureReporter, TracingReporter, Trigger, Triggers, TxState};
pub use session::{AccountBalances, AccountPair, FetchErrors, LockSession, SessionView};
