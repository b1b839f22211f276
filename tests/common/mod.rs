// Shared fixtures for session integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use solana_sdk::pubkey::Pubkey;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokenlock::{
    ActionName, Amount, BalanceSnapshot, CallError, FailureReporter, LockApi, LockSession, Receipt,
    Timestamp, TxContext, TxFailure,
};

pub const WAITING_PERIOD_HOURS: i64 = 24;

pub fn at(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn start() -> Timestamp {
    at(1_700_000_000)
}

/// Open/closed barrier that held calls wait on
pub struct Barrier {
    open: watch::Sender<bool>,
}

impl Barrier {
    fn new() -> Self {
        let (open, _) = watch::channel(true);
        Self { open }
    }

    fn closed() -> Self {
        let (open, _) = watch::channel(false);
        Self { open }
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn open(&self) {
        self.open.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// In-memory ledger with call recording and controllable latency
pub struct FakeLedger {
    positions: Mutex<HashMap<Pubkey, BalanceSnapshot>>,
    wallets: Mutex<HashMap<Pubkey, Amount>>,
    fetches: Mutex<Vec<Pubkey>>,
    mutations: Mutex<Vec<ActionName>>,
    next_failure: Mutex<Option<CallError>>,
    failing_fetches: Mutex<Vec<Pubkey>>,
    signatures: AtomicUsize,
    clock: Mutex<Timestamp>,
    fetch_holds: Mutex<VecDeque<Arc<Barrier>>>,
    pub mutation_barrier: Barrier,
    pub fetch_barrier: Barrier,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            positions: Mutex::new(HashMap::new()),
            wallets: Mutex::new(HashMap::new()),
            fetches: Mutex::new(Vec::new()),
            mutations: Mutex::new(Vec::new()),
            next_failure: Mutex::new(None),
            failing_fetches: Mutex::new(Vec::new()),
            signatures: AtomicUsize::new(0),
            clock: Mutex::new(start()),
            fetch_holds: Mutex::new(VecDeque::new()),
            mutation_barrier: Barrier::new(),
            fetch_barrier: Barrier::new(),
        })
    }

    pub fn set_position(&self, account: Pubkey, snapshot: BalanceSnapshot) {
        self.positions.lock().unwrap().insert(account, snapshot);
    }

    pub fn set_wallet(&self, account: Pubkey, amount: Amount) {
        self.wallets.lock().unwrap().insert(account, amount);
    }

    /// Ledger time used when an unlock starts its waiting period
    pub fn set_clock(&self, now: Timestamp) {
        *self.clock.lock().unwrap() = now;
    }

    pub fn fail_next_mutation(&self, error: CallError) {
        *self.next_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_fetches_for(&self, account: Pubkey) {
        self.failing_fetches.lock().unwrap().push(account);
    }

    /// Hold the next not-yet-claimed `fetch_balances` call until the
    /// returned barrier opens
    pub fn hold_next_fetch(&self) -> Arc<Barrier> {
        let hold = Arc::new(Barrier::closed());
        self.fetch_holds.lock().unwrap().push_back(Arc::clone(&hold));
        hold
    }

    pub fn fetches(&self) -> Vec<Pubkey> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, account: Pubkey) -> usize {
        self.fetches.lock().unwrap().iter().filter(|a| **a == account).count()
    }

    pub fn clear_fetches(&self) {
        self.fetches.lock().unwrap().clear();
    }

    pub fn mutations(&self) -> Vec<ActionName> {
        self.mutations.lock().unwrap().clone()
    }

    async fn mutate(
        &self,
        action: ActionName,
        ctx: TxContext,
        apply: impl FnOnce(&mut BalanceSnapshot, &mut Amount, Timestamp),
    ) -> Result<Receipt, CallError> {
        self.mutations.lock().unwrap().push(action);
        self.mutation_barrier.pass().await;

        if let Some(error) = self.next_failure.lock().unwrap().take() {
            return Err(error);
        }

        let now = *self.clock.lock().unwrap();
        let mut positions = self.positions.lock().unwrap();
        let mut wallets = self.wallets.lock().unwrap();
        let position = positions
            .entry(ctx.from)
            .or_insert_with(|| BalanceSnapshot::known(0, 0, 0, None));
        let wallet = wallets.entry(ctx.from).or_insert(0);
        apply(position, wallet, now);

        let n = self.signatures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Receipt::new(format!("sig-{}-{}", action, n)))
    }
}

#[async_trait]
impl LockApi for FakeLedger {
    async fn lock(&self, amount: Amount, ctx: TxContext) -> Result<Receipt, CallError> {
        self.mutate(ActionName::Lock, ctx, |position, wallet, _| {
            *wallet -= amount;
            position.locked = Some(position.locked.unwrap_or(0) + amount);
        })
        .await
    }

    async fn unlock(&self, ctx: TxContext) -> Result<Receipt, CallError> {
        self.mutate(ActionName::Unlock, ctx, |position, _, now| {
            let locked = position.locked.unwrap_or(0);
            position.locked = Some(0);
            position.unlocking = Some(position.unlocking.unwrap_or(0) + locked);
            position.unlock_maturity = Some(now + Duration::hours(WAITING_PERIOD_HOURS));
        })
        .await
    }

    async fn withdraw_unlocked(&self, ctx: TxContext) -> Result<Receipt, CallError> {
        self.mutate(ActionName::Withdraw, ctx, |position, wallet, _| {
            *wallet += position.unlocked.unwrap_or(0);
            position.unlocked = Some(0);
            position.unlock_maturity = None;
        })
        .await
    }

    async fn fetch_balances(&self, account: Pubkey) -> Result<BalanceSnapshot, CallError> {
        self.fetches.lock().unwrap().push(account);
        let hold = self.fetch_holds.lock().unwrap().pop_front();
        if let Some(hold) = hold {
            hold.pass().await;
        }
        self.fetch_barrier.pass().await;

        if self.failing_fetches.lock().unwrap().contains(&account) {
            return Err(CallError::network("connection refused"));
        }

        let now = *self.clock.lock().unwrap();
        let mut positions = self.positions.lock().unwrap();
        let position = positions
            .entry(account)
            .or_insert_with(|| BalanceSnapshot::known(0, 0, 0, None));

        // Matured unlocks become withdrawable
        if let (Some(unlocking), Some(maturity)) = (position.unlocking, position.unlock_maturity) {
            if unlocking > 0 && now >= maturity {
                position.unlocked = Some(position.unlocked.unwrap_or(0) + unlocking);
                position.unlocking = Some(0);
            }
        }
        Ok(*position)
    }

    async fn fetch_wallet_balance(&self, account: Pubkey) -> Result<Option<Amount>, CallError> {
        Ok(Some(self.wallets.lock().unwrap().get(&account).copied().unwrap_or(0)))
    }
}

/// Reporter that keeps every failure it is handed
#[derive(Default)]
pub struct RecordingReporter {
    pub reported: Mutex<Vec<TxFailure>>,
}

impl RecordingReporter {
    pub fn count(&self) -> usize {
        self.reported.lock().unwrap().len()
    }
}

impl FailureReporter for RecordingReporter {
    fn report(&self, failure: &TxFailure) {
        self.reported.lock().unwrap().push(failure.clone());
    }
}

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub reporter: Arc<RecordingReporter>,
    pub session: Arc<LockSession<FakeLedger>>,
    pub own: Pubkey,
}

pub fn harness() -> Harness {
    let ledger = FakeLedger::new();
    let reporter = Arc::new(RecordingReporter::default());
    let own = Pubkey::new_unique();
    let session = LockSession::with_reporter(Arc::clone(&ledger), own, start(), reporter.clone());
    Harness {
        ledger,
        reporter,
        session,
        own,
    }
}

/// Yield to spawned tasks until `condition` holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
