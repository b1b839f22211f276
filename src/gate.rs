//! Single-flight transaction gate.
//!
//! Every mutating action runs through [`LockSession::run_guarded`]: at most
//! one attempt is in flight, the pending action is published, failures are
//! classified, and the pending marker is only cleared once a balance
//! refresh started after the action has committed.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::api::{LockApi, Receipt, TxContext};
use crate::errors::{CallError, TxFailure};
use crate::session::{CommitGuard, LockSession};

/// Mutating actions a session can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    Lock,
    Unlock,
    Withdraw,
}

impl ActionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pending action and the outcome of the last attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxState {
    pub name: Option<ActionName>,
    pub error: Option<TxFailure>,
}

impl TxState {
    pub const IDLE: Self = Self {
        name: None,
        error: None,
    };

    pub fn pending(name: ActionName) -> Self {
        Self {
            name: Some(name),
            error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.name.is_some()
    }

    /// Error to show in the presentation's error slot, if any.
    pub fn user_facing_error(&self) -> Option<&TxFailure> {
        self.error.as_ref().filter(|failure| failure.is_user_facing())
    }
}

/// Diagnostics channel for failed actions the user did not cancel.
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &TxFailure);
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, failure: &TxFailure) {
        let source = failure.call_error();
        error!(
            action = %failure.action(),
            kind = %source.kind,
            "Error calling {}: {}",
            failure.action(),
            source.message
        );
    }
}

/// Busy marker released on drop, so an attempt that is dropped mid-flight
/// does not wedge the gate.
struct InFlight<'a> {
    busy: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl<A: LockApi> LockSession<A> {
    /// Whether an attempt is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `action` through the gate.
    ///
    /// Returns the receipt on success, `None` on failure or when another
    /// attempt is already in flight (in which case nothing is called).
    pub async fn run_guarded<F, Fut>(&self, name: ActionName, action: F) -> Option<Receipt>
    where
        F: FnOnce(TxContext) -> Fut,
        Fut: Future<Output = Result<Receipt, CallError>>,
    {
        let Some(_in_flight) = InFlight::acquire(&self.busy) else {
            debug!(action = %name, "Transaction already in progress, ignoring trigger");
            return None;
        };

        let Some(ctx) = self.tx_context() else {
            debug!(action = %name, "Session torn down, ignoring trigger");
            return None;
        };

        self.commit(CommitGuard::Any, |state| state.view.tx = TxState::pending(name));

        let (receipt, error) = match action(ctx).await {
            Ok(receipt) => {
                info!(action = %name, signature = %receipt.signature, "Transaction confirmed");
                (Some(receipt), None)
            }
            Err(err) => {
                let failure = TxFailure::classify(name, err);
                match &failure {
                    TxFailure::UserCancelled { .. } => {
                        debug!(action = %name, "Transaction cancelled by user");
                    }
                    TxFailure::RemoteCallFailure { .. } => self.reporter.report(&failure),
                }
                (None, Some(failure))
            }
        };

        // Pending stays set until balances fetched after the action land
        let since = self.generation();
        if self.refresh_since(since).await {
            self.commit(CommitGuard::Any, |state| {
                state.view.tx = TxState { name: None, error };
            });
        }

        receipt
    }

    /// Perform a named action against the session's ledger.
    ///
    /// Locking moves the entire known wallet balance; with nothing to lock
    /// the trigger declines without entering the gate.
    pub async fn on_action(&self, name: ActionName) -> Option<Receipt> {
        match name {
            ActionName::Lock => {
                let Some(amount) = self.view().wallet_balance.filter(|amount| *amount > 0) else {
                    debug!("No transferable balance to lock");
                    return None;
                };
                self.run_guarded(name, |ctx| self.api.lock(amount, ctx)).await
            }
            ActionName::Unlock => self.run_guarded(name, |ctx| self.api.unlock(ctx)).await,
            ActionName::Withdraw => {
                self.run_guarded(name, |ctx| self.api.withdraw_unlocked(ctx)).await
            }
        }
    }

    /// Zero-argument triggers for the presentation surface.
    pub fn triggers(self: &Arc<Self>) -> Triggers<A> {
        Triggers {
            lock: Trigger::new(Arc::clone(self), ActionName::Lock),
            unlock: Trigger::new(Arc::clone(self), ActionName::Unlock),
            withdraw: Trigger::new(Arc::clone(self), ActionName::Withdraw),
        }
    }
}

/// A bound action, ready to hand to a control.
pub struct Trigger<A> {
    session: Arc<LockSession<A>>,
    name: ActionName,
}

impl<A> Trigger<A> {
    fn new(session: Arc<LockSession<A>>, name: ActionName) -> Self {
        Self { session, name }
    }

    pub fn name(&self) -> ActionName {
        self.name
    }
}

impl<A: LockApi> Trigger<A> {
    pub async fn fire(&self) -> Option<Receipt> {
        self.session.on_action(self.name).await
    }
}

impl<A> Clone for Trigger<A> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            name: self.name,
        }
    }
}

pub struct Triggers<A> {
    pub lock: Trigger<A>,
    pub unlock: Trigger<A>,
    pub withdraw: Trigger<A>,
}

impl<A> Triggers<A> {
    pub fn get(&self, name: ActionName) -> &Trigger<A> {
        match name {
            ActionName::Lock => &self.lock,
            ActionName::Unlock => &self.unlock,
            ActionName::Withdraw => &self.withdraw,
        }
    }
}
