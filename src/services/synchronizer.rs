//! Trading Synchronizer
//!
//! Owns the active-account state machine and everything that hangs off it:
//! - Account lists for the user (regular and challenge)
//! - Open trades, pending orders, history and summary of the active account
//! - The polling timers, torn down and respawned on every account switch
//! - Order actions, which refresh state and emit notifications
//!
//! Every poll is tagged with the generation and account id it was issued
//! for. A response that comes back after a switch is discarded.

use crate::config::SyncConfig;
use crate::error::{AppError, Result};
use crate::services::gateway::{BatchOutcome, CloseAllFilter, OrderError, OrderGateway, OrderOutcome};
use crate::services::metrics::{compute_for_account, local_midnight, AccountSnapshot, MetricsCalculator};
use crate::services::policy::ValidationError;
use crate::services::price_cache::PriceCache;
use crate::services::selection::SelectionStore;
use crate::services::watchdog;
use crate::sources::trading_api::TradingApi;
use crate::types::{
    AccountSummary, ActiveSelection, ChallengeStatus, DerivedMetrics, Notification,
    NotificationType, OrderRequest, Trade, TradingAccount,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const MIN_POLL_PERIOD: Duration = Duration::from_millis(100);
const NOTIFICATION_CAPACITY: usize = 256;

// =============================================================================
// State machine
// =============================================================================

/// Which account, if any, the synchronizer is tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncMode {
    #[default]
    Idle,
    ActiveRegular(String),
    ActiveChallenge(String),
}

impl SyncMode {
    fn for_account(account: &TradingAccount) -> Self {
        if account.is_challenge() {
            SyncMode::ActiveChallenge(account.id.clone())
        } else {
            SyncMode::ActiveRegular(account.id.clone())
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        match self {
            SyncMode::Idle => None,
            SyncMode::ActiveRegular(id) | SyncMode::ActiveChallenge(id) => Some(id),
        }
    }

    pub fn is_challenge(&self) -> bool {
        matches!(self, SyncMode::ActiveChallenge(_))
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Idle => write!(f, "idle"),
            SyncMode::ActiveRegular(id) => write!(f, "regular:{}", id),
            SyncMode::ActiveChallenge(id) => write!(f, "challenge:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollKind {
    Trades,
    Challenge,
    History,
    Accounts,
    SlTp,
}

/// Everything the view layer reads.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub regular_accounts: Vec<TradingAccount>,
    pub challenge_accounts: Vec<TradingAccount>,
    pub active: Option<TradingAccount>,
    pub open_trades: Vec<Trade>,
    pub pending_orders: Vec<Trade>,
    pub history: Vec<Trade>,
    pub summary: Option<AccountSummary>,
}

impl SyncState {
    fn find_account(&self, id: &str, challenge: bool) -> Option<&TradingAccount> {
        let list = if challenge {
            &self.challenge_accounts
        } else {
            &self.regular_accounts
        };
        list.iter().find(|a| a.id == id)
    }

    /// Replace the active account with its entry from the fresh lists.
    /// Returns the challenge status transition, if any.
    fn refresh_active(&mut self) -> Option<(ChallengeStatus, ChallengeStatus)> {
        let active = self.active.as_ref()?;
        let fresh = self.find_account(&active.id, active.is_challenge())?.clone();
        let before = active.challenge().map(|c| c.status);
        let after = fresh.challenge().map(|c| c.status);
        self.active = Some(fresh);

        match (before, after) {
            (Some(before), Some(after)) if before != after => Some((before, after)),
            _ => None,
        }
    }

    fn resynthesize_summary(&mut self) {
        if let Some(active) = self.active.as_ref().filter(|a| a.is_challenge()) {
            self.summary = challenge_summary(active, &self.open_trades);
        }
    }
}

/// Challenge accounts have no summary endpoint; derive one from the
/// account's own balance and equity.
pub fn challenge_summary(account: &TradingAccount, open_trades: &[Trade]) -> Option<AccountSummary> {
    let details = account.challenge()?;
    let used_margin: f64 = open_trades.iter().map(|t| t.margin_used).sum();
    Some(AccountSummary {
        balance: details.current_balance,
        credit: Some(account.credit),
        equity: details.current_equity,
        used_margin,
        free_margin: details.current_balance - used_margin,
        floating_pnl: details.current_equity - details.current_balance,
        margin_level: (used_margin > 0.0).then(|| details.current_equity / used_margin * 100.0),
    })
}

fn status_notification(before: ChallengeStatus, after: ChallengeStatus, account: &TradingAccount) -> Option<Notification> {
    match (before, after) {
        (_, ChallengeStatus::Failed) => {
            let reason = account
                .challenge()
                .and_then(|c| c.fail_reason.clone())
                .unwrap_or_else(|| "Challenge rules violated".to_string());
            Some(Notification::error("Challenge Failed", reason).acknowledged())
        }
        (_, ChallengeStatus::Passed) => Some(
            Notification::success("Challenge Passed", format!("Account {} passed", account.account_id))
                .acknowledged(),
        ),
        _ => None,
    }
}

struct Control {
    mode: SyncMode,
    timers: Vec<JoinHandle<()>>,
}

// =============================================================================
// Synchronizer
// =============================================================================

/// Keeps the active account's state in sync with the backend.
pub struct TradingSynchronizer {
    user_id: String,
    config: SyncConfig,
    api: Arc<dyn TradingApi>,
    prices: Arc<PriceCache>,
    store: Arc<SelectionStore>,
    gateway: OrderGateway,
    control: Mutex<Control>,
    generation: AtomicU64,
    state: RwLock<SyncState>,
    data_version: AtomicU64,
    metrics: MetricsCalculator,
    notifications: broadcast::Sender<Notification>,
}

impl TradingSynchronizer {
    pub fn new(
        user_id: &str,
        config: SyncConfig,
        api: Arc<dyn TradingApi>,
        prices: Arc<PriceCache>,
        store: Arc<SelectionStore>,
    ) -> Arc<Self> {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Arc::new(Self {
            user_id: user_id.to_string(),
            config,
            gateway: OrderGateway::new(api.clone(), prices.clone()),
            api,
            prices,
            store,
            control: Mutex::new(Control {
                mode: SyncMode::Idle,
                timers: Vec::new(),
            }),
            generation: AtomicU64::new(0),
            state: RwLock::new(SyncState::default()),
            data_version: AtomicU64::new(0),
            metrics: MetricsCalculator::new(),
            notifications,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn mode(&self) -> SyncMode {
        self.lock_control().mode.clone()
    }

    /// Copy of the current state.
    pub fn state(&self) -> SyncState {
        self.read_state().clone()
    }

    pub fn active_account(&self) -> Option<TradingAccount> {
        self.read_state().active.clone()
    }

    pub fn open_trades(&self) -> Vec<Trade> {
        self.read_state().open_trades.clone()
    }

    pub fn pending_orders(&self) -> Vec<Trade> {
        self.read_state().pending_orders.clone()
    }

    pub fn prices(&self) -> Arc<PriceCache> {
        self.prices.clone()
    }

    /// Bumped on every accepted poll result.
    pub fn data_version(&self) -> u64 {
        self.data_version.load(Ordering::Acquire)
    }

    /// Number of live polling timers.
    pub fn timer_count(&self) -> usize {
        self.lock_control()
            .timers
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Live metrics for the active account, recomputed only when prices or
    /// account data changed since the last call.
    pub fn metrics(&self) -> Option<DerivedMetrics> {
        let state = self.read_state();
        let account = state.active.as_ref()?;
        let snapshot = match &state.summary {
            Some(summary) => AccountSnapshot {
                balance: summary.balance,
                credit: summary.credit.unwrap_or(account.credit),
            },
            None => AccountSnapshot {
                balance: account.balance,
                credit: account.credit,
            },
        };
        let day_start = local_midnight();

        let value = self.metrics.get_or_compute(
            self.prices.version(),
            self.data_version(),
            day_start,
            || {
                compute_for_account(
                    account,
                    snapshot,
                    &state.open_trades,
                    &self.prices.snapshot(),
                    &state.history,
                    day_start,
                )
            },
        );
        Some(value)
    }

    // -------------------------------------------------------------------------
    // Accounts and transitions
    // -------------------------------------------------------------------------

    /// Load both account lists. Either may fail without blocking the other;
    /// an error is returned only when both do.
    pub async fn load_accounts(&self) -> Result<()> {
        let (regular, challenge) = tokio::join!(
            self.api.fetch_trading_accounts(&self.user_id),
            self.api.fetch_challenge_accounts(&self.user_id)
        );

        let mut state = self.write_state();
        let mut failure = None;
        match regular {
            Ok(list) => state.regular_accounts = list.into_iter().map(TradingAccount::from).collect(),
            Err(e) => {
                warn!("Failed to load trading accounts: {}", e);
                failure = Some(e);
            }
        }
        let challenge_ok = match challenge {
            Ok(list) => {
                state.challenge_accounts = list.into_iter().map(TradingAccount::from).collect();
                true
            }
            Err(e) => {
                warn!("Failed to load challenge accounts: {}", e);
                false
            }
        };
        state.refresh_active();
        state.resynthesize_summary();
        info!(
            "Accounts: {} regular, {} challenge",
            state.regular_accounts.len(),
            state.challenge_accounts.len()
        );
        drop(state);
        self.data_version.fetch_add(1, Ordering::AcqRel);

        match failure {
            Some(e) if !challenge_ok => Err(e),
            _ => Ok(()),
        }
    }

    /// Load accounts and re-activate the persisted selection, falling back
    /// to the first regular account.
    pub async fn restore(self: &Arc<Self>) -> Result<Option<ActiveSelection>> {
        self.load_accounts().await?;

        let stored = self.store.load()?;
        let account = {
            let state = self.read_state();
            let stored_account = stored
                .as_ref()
                .and_then(|sel| state.find_account(sel.id(), sel.is_challenge()))
                .cloned();
            if stored_account.is_none() {
                if let Some(sel) = &stored {
                    warn!("Stored account {} no longer exists", sel.id());
                }
            }
            stored_account.or_else(|| state.regular_accounts.first().cloned())
        };

        match account {
            Some(account) => {
                let selection = account.selection();
                self.activate(account).await;
                Ok(Some(selection))
            }
            None => {
                info!("No account to activate");
                Ok(None)
            }
        }
    }

    pub async fn select_regular(self: &Arc<Self>, account_id: &str) -> Result<()> {
        self.select(account_id, false).await
    }

    pub async fn select_challenge(self: &Arc<Self>, account_id: &str) -> Result<()> {
        self.select(account_id, true).await
    }

    async fn select(self: &Arc<Self>, account_id: &str, challenge: bool) -> Result<()> {
        let account = self
            .read_state()
            .find_account(account_id, challenge)
            .cloned()
            .ok_or_else(|| AppError::AccountNotFound(account_id.to_string()))?;
        self.activate(account).await;
        Ok(())
    }

    /// Tear down the old timers, switch state, spawn the new timer set and
    /// do the initial load.
    async fn activate(self: &Arc<Self>, account: TradingAccount) {
        let account_id = account.id.clone();
        let challenge = account.is_challenge();
        let mode = SyncMode::for_account(&account);

        let generation = {
            // Persisted selection and mode change together.
            let mut control = self.lock_control();
            if let Err(e) = self.store.save(&account.selection()) {
                warn!("Failed to persist selection: {}", e);
            }
            for timer in control.timers.drain(..) {
                timer.abort();
            }
            let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

            {
                let mut state = self.write_state();
                state.summary = challenge_summary(&account, &[]);
                state.active = Some(account);
                state.open_trades.clear();
                state.pending_orders.clear();
                state.history.clear();
            }
            self.data_version.fetch_add(1, Ordering::AcqRel);
            self.metrics.invalidate();

            info!("Sync {} -> {}", control.mode, mode);
            control.mode = mode;
            control.timers = self.spawn_timers(generation, &account_id, challenge);
            generation
        };

        self.refresh(generation, &account_id, challenge).await;
    }

    /// Stop all timers and go idle. The persisted selection is kept.
    pub fn stop(&self) {
        let mut control = self.lock_control();
        for timer in control.timers.drain(..) {
            timer.abort();
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        {
            let mut state = self.write_state();
            state.active = None;
            state.open_trades.clear();
            state.pending_orders.clear();
            state.history.clear();
            state.summary = None;
        }
        self.data_version.fetch_add(1, Ordering::AcqRel);
        self.metrics.invalidate();

        info!("Sync {} -> idle", control.mode);
        control.mode = SyncMode::Idle;
    }

    /// Re-fetch everything for the active account right away.
    pub async fn refresh_now(&self) {
        let Some((generation, account_id, challenge)) = self.current() else {
            return;
        };
        self.refresh(generation, &account_id, challenge).await;
        if challenge {
            self.poll_challenge(generation, &account_id).await;
        }
    }

    // -------------------------------------------------------------------------
    // Timers and polls
    // -------------------------------------------------------------------------

    fn spawn_timers(self: &Arc<Self>, generation: u64, account_id: &str, challenge: bool) -> Vec<JoinHandle<()>> {
        let mut schedule = vec![
            (PollKind::Trades, self.config.trades_interval),
            (PollKind::History, self.config.history_interval),
            (PollKind::Accounts, self.config.accounts_interval),
            (PollKind::SlTp, self.config.sltp_interval),
        ];
        if challenge {
            schedule.push((PollKind::Challenge, self.config.challenge_interval));
        }

        schedule
            .into_iter()
            .map(|(kind, period)| {
                let sync = self.clone();
                let account_id = account_id.to_string();
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(period.max(MIN_POLL_PERIOD));
                    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    // First tick is immediate; the transition already loaded.
                    interval.tick().await;
                    loop {
                        interval.tick().await;
                        if sync.generation.load(Ordering::Acquire) != generation {
                            break;
                        }
                        sync.run_poll(kind, generation, &account_id, challenge).await;
                    }
                })
            })
            .collect()
    }

    async fn run_poll(&self, kind: PollKind, generation: u64, account_id: &str, challenge: bool) {
        match kind {
            PollKind::Trades => self.poll_trades(generation, account_id, challenge).await,
            PollKind::Challenge => self.poll_challenge(generation, account_id).await,
            PollKind::History => self.poll_history(generation, account_id).await,
            PollKind::Accounts => self.poll_accounts(generation, account_id).await,
            PollKind::SlTp => self.poll_sltp(generation, account_id, challenge).await,
        }
    }

    async fn refresh(&self, generation: u64, account_id: &str, challenge: bool) {
        tokio::join!(
            self.poll_trades(generation, account_id, challenge),
            self.poll_history(generation, account_id)
        );
    }

    /// Open trades, pending orders and summary.
    async fn poll_trades(&self, generation: u64, account_id: &str, challenge: bool) {
        let (open, pending) = tokio::join!(
            self.api.fetch_open_trades(account_id),
            self.api.fetch_pending_orders(account_id)
        );

        match open {
            Ok(trades) => {
                self.apply(generation, account_id, |state| {
                    state.open_trades = trades;
                    state.resynthesize_summary();
                });
            }
            Err(e) => warn!("Open trades for {} unavailable: {}", account_id, e),
        }
        match pending {
            Ok(orders) => {
                self.apply(generation, account_id, |state| state.pending_orders = orders);
            }
            Err(e) => warn!("Pending orders for {} unavailable: {}", account_id, e),
        }

        if !challenge {
            let prices = self.prices.snapshot();
            match self.api.fetch_account_summary(account_id, &prices).await {
                Ok(summary) => {
                    self.apply(generation, account_id, |state| state.summary = Some(summary));
                }
                Err(e) => warn!("Summary for {} unavailable: {}", account_id, e),
            }
        }
    }

    async fn poll_history(&self, generation: u64, account_id: &str) {
        match self
            .api
            .fetch_trade_history(account_id, self.config.history_limit)
            .await
        {
            Ok(history) => {
                self.apply(generation, account_id, |state| state.history = history);
            }
            Err(e) => warn!("History for {} unavailable: {}", account_id, e),
        }
    }

    /// Challenge baselines (day start equity, lowest equity, status).
    async fn poll_challenge(&self, generation: u64, account_id: &str) {
        match self.api.fetch_challenge_accounts(&self.user_id).await {
            Ok(list) => {
                let transition = self.apply(generation, account_id, |state| {
                    state.challenge_accounts = list.into_iter().map(TradingAccount::from).collect();
                    let transition = state.refresh_active();
                    state.resynthesize_summary();
                    transition.and_then(|(before, after)| {
                        state
                            .active
                            .as_ref()
                            .and_then(|a| status_notification(before, after, a))
                    })
                });
                if let Some(Some(notification)) = transition {
                    self.notify(notification);
                }
            }
            Err(e) => warn!("Challenge stats unavailable: {}", e),
        }
    }

    async fn poll_accounts(&self, generation: u64, account_id: &str) {
        let (regular, challenge) = tokio::join!(
            self.api.fetch_trading_accounts(&self.user_id),
            self.api.fetch_challenge_accounts(&self.user_id)
        );

        let transition = self.apply(generation, account_id, |state| {
            match regular {
                Ok(list) => state.regular_accounts = list.into_iter().map(TradingAccount::from).collect(),
                Err(e) => warn!("Trading accounts unavailable: {}", e),
            }
            match challenge {
                Ok(list) => state.challenge_accounts = list.into_iter().map(TradingAccount::from).collect(),
                Err(e) => warn!("Challenge accounts unavailable: {}", e),
            }
            let transition = state.refresh_active();
            state.resynthesize_summary();
            transition.and_then(|(before, after)| {
                state
                    .active
                    .as_ref()
                    .and_then(|a| status_notification(before, after, a))
            })
        });
        if let Some(Some(notification)) = transition {
            self.notify(notification);
        }
    }

    async fn poll_sltp(&self, generation: u64, account_id: &str, challenge: bool) {
        let open_count = self.read_state().open_trades.len();
        let prices = self.prices.snapshot();

        let report = match watchdog::check_once(self.api.as_ref(), account_id, open_count, &prices).await {
            Ok(report) => report,
            Err(e) => {
                warn!("SL/TP check failed: {}", e);
                return;
            }
        };
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Discarding SL/TP report for {}", account_id);
            return;
        }

        if report.closed_for_active > 0 {
            info!("{} trade(s) of {} closed server-side", report.closed_for_active, account_id);
        }
        for notification in report.notifications {
            self.notify(notification);
        }
        if report.refresh {
            self.poll_trades(generation, account_id, challenge).await;
        }
    }

    /// Apply a poll result if it is still for the active account.
    fn apply<R>(&self, generation: u64, account_id: &str, update: impl FnOnce(&mut SyncState) -> R) -> Option<R> {
        let mut state = self.write_state();
        let current = self.generation.load(Ordering::Acquire) == generation
            && state.active.as_ref().map(|a| a.id.as_str()) == Some(account_id);
        if !current {
            debug!("Discarding stale response for {}", account_id);
            return None;
        }

        let result = update(&mut state);
        drop(state);
        self.data_version.fetch_add(1, Ordering::AcqRel);
        Some(result)
    }

    // -------------------------------------------------------------------------
    // Order actions
    // -------------------------------------------------------------------------

    /// Submit an order for the active account.
    pub async fn place_order(&self, order: &OrderRequest) -> std::result::Result<OrderOutcome, OrderError> {
        let (generation, account) = self.active_for_order()?;
        match self.gateway.place_order(&account, order).await {
            Ok(outcome) => {
                self.notify(outcome.notification());
                if outcome.should_refresh() {
                    self.poll_trades(generation, &account.id, account.is_challenge()).await;
                }
                Ok(outcome)
            }
            Err(e) => {
                self.notify(e.notification());
                Err(e)
            }
        }
    }

    /// Close one open trade of the active account.
    pub async fn close_trade(&self, trade_id: &str) -> std::result::Result<Option<f64>, OrderError> {
        let (generation, account) = self.active_for_order()?;
        let trade = self.find_trade(trade_id, false)?;

        match self.gateway.close_trade(&trade).await {
            Ok(pnl) => {
                let body = match pnl {
                    Some(pnl) => format!("{} closed. P&L: {:.2}", trade.symbol, pnl),
                    None => format!("{} closed", trade.symbol),
                };
                self.notify(Notification::success("Trade Closed", body));
                self.poll_trades(generation, &account.id, account.is_challenge()).await;
                Ok(pnl)
            }
            Err(e) => {
                self.notify(e.notification());
                Err(e)
            }
        }
    }

    /// Change SL/TP on an open trade or pending order.
    pub async fn modify_sl_tp(
        &self,
        trade_id: &str,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> std::result::Result<(), OrderError> {
        let (generation, account) = self.active_for_order()?;
        let trade = self
            .find_trade(trade_id, false)
            .or_else(|_| self.find_trade(trade_id, true))?;

        match self.gateway.modify_sl_tp(&account, &trade, stop_loss, take_profit).await {
            Ok(()) => {
                self.notify(Notification::success("Trade Modified", format!("{} SL/TP updated", trade.symbol)));
                self.poll_trades(generation, &account.id, account.is_challenge()).await;
                Ok(())
            }
            Err(e) => {
                self.notify(e.notification());
                Err(e)
            }
        }
    }

    pub async fn cancel_pending_order(&self, order_id: &str) -> std::result::Result<(), OrderError> {
        let (generation, account) = self.active_for_order()?;
        let order = self.find_trade(order_id, true)?;

        match self.gateway.cancel_pending_order(&order.id).await {
            Ok(()) => {
                self.notify(Notification::success("Order Cancelled", format!("{} order cancelled", order.symbol)));
                self.poll_trades(generation, &account.id, account.is_challenge()).await;
                Ok(())
            }
            Err(e) => {
                self.notify(e.notification());
                Err(e)
            }
        }
    }

    pub async fn close_all(&self, filter: CloseAllFilter) -> std::result::Result<BatchOutcome, OrderError> {
        let (generation, account) = self.active_for_order()?;
        let trades = self.open_trades();

        let outcome = self.gateway.close_all(&trades, filter).await?;
        self.notify(outcome.notification());
        if outcome.attempted > 0 {
            self.poll_trades(generation, &account.id, account.is_challenge()).await;
        }
        Ok(outcome)
    }

    /// Close every open trade and cancel every pending order.
    pub async fn kill_switch(&self) -> std::result::Result<BatchOutcome, OrderError> {
        let (generation, account) = self.active_for_order()?;
        let (open, pending) = {
            let state = self.read_state();
            (state.open_trades.clone(), state.pending_orders.clone())
        };

        let outcome = self.gateway.kill_switch(&open, &pending).await?;
        self.notify(outcome.notification());
        self.poll_trades(generation, &account.id, account.is_challenge()).await;
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn current(&self) -> Option<(u64, String, bool)> {
        let control = self.lock_control();
        let account_id = control.mode.account_id()?.to_string();
        Some((
            self.generation.load(Ordering::Acquire),
            account_id,
            control.mode.is_challenge(),
        ))
    }

    fn active_for_order(&self) -> std::result::Result<(u64, TradingAccount), OrderError> {
        let generation = self.generation.load(Ordering::Acquire);
        let account = self
            .active_account()
            .ok_or(OrderError::Validation(ValidationError::NoActiveAccount))?;
        Ok((generation, account))
    }

    fn find_trade(&self, id: &str, pending: bool) -> std::result::Result<Trade, OrderError> {
        let state = self.read_state();
        let list = if pending {
            &state.pending_orders
        } else {
            &state.open_trades
        };
        list.iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| OrderError::TradeNotFound(id.to_string()))
    }

    fn notify(&self, notification: Notification) {
        match notification.notification_type {
            NotificationType::Error => error!("{}: {}", notification.title, notification.message),
            NotificationType::Warning => warn!("{}: {}", notification.title, notification.message),
            _ => info!("{}: {}", notification.title, notification.message),
        }
        if self.notifications.send(notification).is_err() {
            debug!("No notification subscribers");
        }
    }

    fn lock_control(&self) -> std::sync::MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SyncState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SyncState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
