//! Dual-account synchronizer.
//!
//! A [`LockSession`] tracks the acting account and an optional second
//! account, refreshes both whenever an input changes, and publishes every
//! committed [`SessionView`] on a watch channel. Refreshes are tagged with a
//! generation; results of a superseded refresh are dropped, and nothing is
//! published once the session is torn down.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use solana_sdk::pubkey::Pubkey;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::{LockApi, TxContext};
use crate::balances::{Amount, BalanceSnapshot, Timestamp};
use crate::conditions::{derive_conditions, Conditions};
use crate::errors::{CallError, FetchFailure};
use crate::gate::{FailureReporter, TracingReporter, TxState};
use crate::lock_utils::lock_or_recover;

/// The acting account and the optional account being watched alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPair {
    pub own: Pubkey,
    pub other: Option<Pubkey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountBalances {
    pub own: BalanceSnapshot,
    pub other: BalanceSnapshot,
}

/// Latest failed read per account; cleared by the next successful one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchErrors {
    pub own: Option<FetchFailure>,
    /// Transferable wallet balance of the acting account
    pub wallet: Option<FetchFailure>,
    pub other: Option<FetchFailure>,
}

/// Everything the presentation surface renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub accounts: AccountPair,
    pub clock: Timestamp,
    pub balances: AccountBalances,
    pub wallet_balance: Option<Amount>,
    pub conditions: Conditions,
    pub tx: TxState,
    pub fetch_errors: FetchErrors,
    /// Incremented on every committed change
    pub revision: u64,
}

impl SessionView {
    fn initial(own: Pubkey, clock: Timestamp) -> Self {
        Self {
            accounts: AccountPair { own, other: None },
            clock,
            balances: AccountBalances::default(),
            wallet_balance: None,
            conditions: Conditions::ALL_DISABLED,
            tx: TxState::IDLE,
            fetch_errors: FetchErrors::default(),
            revision: 0,
        }
    }

    /// Conditions as the controls should show them: all disabled while a
    /// transaction is pending.
    pub fn controls(&self) -> Conditions {
        if self.tx.is_pending() {
            Conditions::ALL_DISABLED
        } else {
            self.conditions
        }
    }

    fn rederive(&mut self) {
        self.conditions = derive_conditions(&self.balances.own, self.wallet_balance, self.clock);
    }
}

pub(crate) struct SessionState {
    pub(crate) view: SessionView,
    generation: u64,
    /// Generation of the last refresh whose results were committed
    settled: u64,
    torn_down: bool,
}

/// Which commits are still allowed to land.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CommitGuard {
    /// Any commit before teardown
    Any,
    /// Only while the given refresh generation is current
    Generation(u64),
}

pub struct LockSession<A> {
    pub(crate) api: Arc<A>,
    pub(crate) reporter: Arc<dyn FailureReporter>,
    pub(crate) busy: AtomicBool,
    state: Mutex<SessionState>,
    publisher: watch::Sender<SessionView>,
}

impl<A: LockApi> LockSession<A> {
    /// Create a session for `own`, reporting failures through `tracing`.
    pub fn new(api: Arc<A>, own: Pubkey, clock: Timestamp) -> Arc<Self> {
        Self::with_reporter(api, own, clock, Arc::new(TracingReporter))
    }

    pub fn with_reporter(
        api: Arc<A>,
        own: Pubkey,
        clock: Timestamp,
        reporter: Arc<dyn FailureReporter>,
    ) -> Arc<Self> {
        let view = SessionView::initial(own, clock);
        let (publisher, _) = watch::channel(view.clone());

        Arc::new(Self {
            api,
            reporter,
            busy: AtomicBool::new(false),
            state: Mutex::new(SessionState {
                view,
                generation: 0,
                settled: 0,
                torn_down: false,
            }),
            publisher,
        })
    }

    /// Latest committed view.
    pub fn view(&self) -> SessionView {
        lock_or_recover(&self.state, "session state").view.clone()
    }

    /// Receiver that observes every committed view.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.publisher.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        lock_or_recover(&self.state, "session state").torn_down
    }

    /// Initial refresh of both accounts.
    pub async fn init(&self) {
        debug!("Session mounted");
        self.refresh().await;
    }

    /// Apply new inputs; refresh when any of them changed.
    ///
    /// A changed account identity resets that account's snapshot to
    /// unknown before anything is fetched. A cleared second account is
    /// never fetched.
    pub async fn on_dependency_change(&self, own: Pubkey, other: Option<Pubkey>, clock: Timestamp) {
        let mut changed = false;
        self.commit(CommitGuard::Any, |state| {
            let view = &mut state.view;
            if view.accounts.own == own && view.accounts.other == other && view.clock == clock {
                return;
            }
            changed = true;

            if view.accounts.own != own {
                view.accounts.own = own;
                view.balances.own = BalanceSnapshot::UNKNOWN;
                view.wallet_balance = None;
                view.fetch_errors.own = None;
                view.fetch_errors.wallet = None;
            }
            if view.accounts.other != other {
                view.accounts.other = other;
                view.balances.other = BalanceSnapshot::UNKNOWN;
                view.fetch_errors.other = None;
            }
            view.clock = clock;
            view.rederive();

            // Anything in flight was fetched for the old inputs
            state.generation += 1;
        });

        if changed {
            self.refresh().await;
        }
    }

    /// Advance the session clock.
    pub async fn tick(&self, clock: Timestamp) {
        let accounts = self.view().accounts;
        self.on_dependency_change(accounts.own, accounts.other, clock).await;
    }

    /// Track a second account, or stop tracking it with `None`.
    pub async fn set_other_account(&self, other: Option<Pubkey>) {
        let view = self.view();
        self.on_dependency_change(view.accounts.own, other, view.clock).await;
    }

    /// Stop publishing. In-flight refreshes finish but their results are
    /// discarded.
    pub fn on_teardown(&self) {
        let mut state = lock_or_recover(&self.state, "session state");
        state.torn_down = true;
        state.generation += 1;
        debug!("Session torn down");
    }

    /// Fetch both accounts and re-derive conditions.
    ///
    /// Fetch failures keep the previous snapshot and are recorded in
    /// `SessionView::fetch_errors`; they never propagate.
    pub(crate) async fn refresh(&self) {
        let (generation, accounts) = {
            let mut state = lock_or_recover(&self.state, "session state");
            if state.torn_down {
                return;
            }
            state.generation += 1;
            (state.generation, state.view.accounts)
        };
        debug!(generation, "Refreshing balances");

        let own = self.api.fetch_balances(accounts.own).await;
        let wallet = self.api.fetch_wallet_balance(accounts.own).await;
        let other = match accounts.other {
            Some(account) => Some((account, self.api.fetch_balances(account).await)),
            None => None,
        };

        let committed = self.commit(CommitGuard::Generation(generation), |state| {
            let view = &mut state.view;

            match own {
                Ok(snapshot) => {
                    view.balances.own = snapshot;
                    view.fetch_errors.own = None;
                }
                Err(source) => view.fetch_errors.own = Some(fetch_failure(accounts.own, source)),
            }

            // An unreadable wallet leaves nothing to lock
            match wallet {
                Ok(balance) => {
                    view.wallet_balance = balance;
                    view.fetch_errors.wallet = None;
                }
                Err(source) => {
                    view.wallet_balance = None;
                    view.fetch_errors.wallet = Some(fetch_failure(accounts.own, source));
                }
            }

            match other {
                Some((_, Ok(snapshot))) => {
                    view.balances.other = snapshot;
                    view.fetch_errors.other = None;
                }
                Some((account, Err(source))) => {
                    view.fetch_errors.other = Some(fetch_failure(account, source));
                }
                None => {
                    view.balances.other = BalanceSnapshot::UNKNOWN;
                    view.fetch_errors.other = None;
                }
            }

            view.rederive();
            state.settled = generation;
        });

        if !committed {
            debug!(generation, "Discarding superseded refresh");
        }
    }

    /// Current refresh generation; any refresh started later is tagged
    /// with a larger one.
    pub(crate) fn generation(&self) -> u64 {
        lock_or_recover(&self.state, "session state").generation
    }

    /// Refresh until some refresh started after generation `since` has
    /// committed. A refresh superseded by a dependency change is retried.
    /// Returns false once the session is torn down.
    pub(crate) async fn refresh_since(&self, since: u64) -> bool {
        loop {
            self.refresh().await;

            let (torn_down, settled) = {
                let state = lock_or_recover(&self.state, "session state");
                (state.torn_down, state.settled)
            };
            if torn_down {
                return false;
            }
            if settled > since {
                return true;
            }
            debug!(since, settled, "Refresh superseded, refreshing again");
        }
    }

    pub(crate) fn tx_context(&self) -> Option<TxContext> {
        let state = lock_or_recover(&self.state, "session state");
        (!state.torn_down).then(|| TxContext {
            from: state.view.accounts.own,
        })
    }

    /// Apply `mutate` and publish the result, unless the session is torn
    /// down or the guard's generation is stale. Returns whether it landed.
    pub(crate) fn commit<F>(&self, guard: CommitGuard, mutate: F) -> bool
    where
        F: FnOnce(&mut SessionState),
    {
        let mut state = lock_or_recover(&self.state, "session state");
        if state.torn_down {
            return false;
        }
        if let CommitGuard::Generation(generation) = guard {
            if generation != state.generation {
                return false;
            }
        }

        let before = state.view.clone();
        mutate(&mut state);
        if state.view == before {
            return true;
        }

        state.view.revision += 1;
        self.publisher.send_replace(state.view.clone());
        true
    }
}

fn fetch_failure(account: Pubkey, source: CallError) -> FetchFailure {
    warn!(account = %account, "Failed to fetch balances: {}", source);
    FetchFailure { account, source }
}
