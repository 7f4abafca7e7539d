//! Real-time account metrics.
//!
//! Everything here is a pure function of the account snapshot, the open
//! trades, the price cache and today's closed trades. Inputs are never
//! mutated. A trade whose symbol has no price yet contributes zero.

use crate::types::{
    ChallengeDetails, ChallengeMetrics, DerivedMetrics, PriceMap, Trade, TradeSide,
    TradingAccount,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::Mutex;

/// Balance and credit the metrics are computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountSnapshot {
    pub balance: f64,
    pub credit: f64,
}

/// Floating P&L of one open trade.
///
/// BUY exits at the bid, SELL exits at the ask. A missing quote, or a missing
/// bid, yields zero.
pub fn trade_pnl(trade: &Trade, prices: &PriceMap) -> f64 {
    let quote = match prices.get(&trade.symbol) {
        Some(q) if q.bid.is_some() => q,
        _ => return 0.0,
    };
    let exit = match trade.side {
        TradeSide::Buy => quote.bid,
        TradeSide::Sell => quote.ask,
    };
    let exit = match exit {
        Some(price) => price,
        None => return 0.0,
    };

    let raw = (exit - trade.open_price) * trade.side.sign();
    raw * trade.quantity * trade.contract_size - trade.commission - trade.swap
}

/// Sum of floating P&L over open trades.
pub fn total_floating_pnl(open_trades: &[Trade], prices: &PriceMap) -> f64 {
    open_trades.iter().map(|t| trade_pnl(t, prices)).sum()
}

/// Realized P&L of trades closed at or after `since`.
pub fn realized_since(history: &[Trade], since: DateTime<Utc>) -> f64 {
    history
        .iter()
        .filter(|t| t.closed_at.map(|at| at >= since).unwrap_or(false))
        .filter_map(|t| t.realized_pnl)
        .sum()
}

/// Start of the current local day, in UTC.
pub fn local_midnight() -> DateTime<Utc> {
    let today = Local::now().date_naive();
    let midnight = today.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc::now(),
    }
}

/// Drawdown and profit figures for a challenge account at `equity`.
pub fn challenge_metrics(details: &ChallengeDetails, equity: f64) -> ChallengeMetrics {
    let daily_drawdown_pct = if details.day_start_equity > 0.0 {
        ((details.day_start_equity - equity) / details.day_start_equity * 100.0).max(0.0)
    } else {
        0.0
    };

    let (overall_drawdown_pct, profit_pct) = if details.initial_balance > 0.0 {
        let lowest = details.lowest_equity_overall.min(equity);
        (
            ((details.initial_balance - lowest) / details.initial_balance * 100.0).max(0.0),
            (equity - details.initial_balance) / details.initial_balance * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let rules = &details.challenge.rules;
    ChallengeMetrics {
        daily_drawdown_pct,
        overall_drawdown_pct,
        profit_pct,
        daily_breached: rules
            .max_daily_drawdown_percent
            .map(|limit| daily_drawdown_pct >= limit)
            .unwrap_or(false),
        overall_breached: rules
            .max_overall_drawdown_percent
            .map(|limit| overall_drawdown_pct >= limit)
            .unwrap_or(false),
        target_reached: rules
            .profit_target_phase1_percent
            .map(|target| profit_pct >= target)
            .unwrap_or(false),
    }
}

/// Compute the full metrics set. `day_start` bounds "today" for realized P&L.
pub fn compute_metrics(
    snapshot: AccountSnapshot,
    challenge: Option<&ChallengeDetails>,
    open_trades: &[Trade],
    prices: &PriceMap,
    history: &[Trade],
    day_start: DateTime<Utc>,
) -> DerivedMetrics {
    let total_floating_pnl = total_floating_pnl(open_trades, prices);
    let equity = snapshot.balance + snapshot.credit + total_floating_pnl;
    let used_margin: f64 = open_trades.iter().map(|t| t.margin_used).sum();
    let free_margin = snapshot.balance - used_margin;
    let margin_level = if used_margin > 0.0 {
        Some(equity / used_margin * 100.0)
    } else {
        None
    };
    let today_pnl = realized_since(history, day_start) + total_floating_pnl;

    DerivedMetrics {
        total_floating_pnl,
        equity,
        used_margin,
        free_margin,
        margin_level,
        today_pnl,
        challenge: challenge.map(|details| challenge_metrics(details, equity)),
    }
}

/// Convenience wrapper taking the account directly.
pub fn compute_for_account(
    account: &TradingAccount,
    snapshot: AccountSnapshot,
    open_trades: &[Trade],
    prices: &PriceMap,
    history: &[Trade],
    day_start: DateTime<Utc>,
) -> DerivedMetrics {
    compute_metrics(
        snapshot,
        account.challenge(),
        open_trades,
        prices,
        history,
        day_start,
    )
}

/// Memoizes [`compute_metrics`] on a caller-supplied version key.
#[derive(Default)]
pub struct MetricsCalculator {
    last: Mutex<Option<((u64, u64, i64), DerivedMetrics)>>,
}

impl MetricsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value when `(price_version, data_version, day)`
    /// matches the previous call, otherwise run `compute`.
    pub fn get_or_compute<F>(
        &self,
        price_version: u64,
        data_version: u64,
        day_start: DateTime<Utc>,
        compute: F,
    ) -> DerivedMetrics
    where
        F: FnOnce() -> DerivedMetrics,
    {
        let key = (price_version, data_version, day_start.timestamp());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached_key, value)) = last.as_ref() {
            if *cached_key == key {
                return *value;
            }
        }
        let value = compute();
        *last = Some((key, value));
        value
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Quote, TradeStatus};

    fn trade(side: TradeSide, open_price: f64) -> Trade {
        Trade {
            id: "t".to_string(),
            symbol: "EURUSD".to_string(),
            side,
            quantity: 1.0,
            open_price,
            contract_size: 100_000.0,
            margin_used: 0.0,
            commission: 0.0,
            swap: 0.0,
            stop_loss: None,
            take_profit: None,
            order_type: None,
            pending_price: None,
            status: TradeStatus::Open,
            trading_account_id: None,
            opened_at: None,
            close_price: None,
            closed_at: None,
            realized_pnl: None,
            closed_by: None,
        }
    }

    #[test]
    fn test_sell_without_ask_is_zero() {
        let mut prices = PriceMap::new();
        prices.insert("EURUSD".to_string(), Quote { bid: Some(1.1), ask: None });
        assert_eq!(trade_pnl(&trade(TradeSide::Sell, 1.2), &prices), 0.0);
    }

    #[test]
    fn test_missing_bid_is_zero_even_for_sell() {
        let mut prices = PriceMap::new();
        prices.insert("EURUSD".to_string(), Quote { bid: None, ask: Some(1.1) });
        assert_eq!(trade_pnl(&trade(TradeSide::Sell, 1.2), &prices), 0.0);
    }

    #[test]
    fn test_commission_and_swap_subtracted() {
        let mut t = trade(TradeSide::Buy, 1.0);
        t.commission = 3.0;
        t.swap = 1.5;
        let mut prices = PriceMap::new();
        prices.insert("EURUSD".to_string(), Quote::new(1.0, 1.0001));
        assert!((trade_pnl(&t, &prices) + 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_memoization_reuses_value() {
        let calc = MetricsCalculator::new();
        let day = Utc::now();
        let mut calls = 0;
        calc.get_or_compute(1, 1, day, || {
            calls += 1;
            DerivedMetrics::default()
        });
        calc.get_or_compute(1, 1, day, || {
            calls += 1;
            DerivedMetrics::default()
        });
        assert_eq!(calls, 1);

        calc.get_or_compute(2, 1, day, || {
            calls += 1;
            DerivedMetrics::default()
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_zero_baselines_do_not_divide() {
        let details = ChallengeDetails {
            current_step: 1,
            challenge: Default::default(),
            status: crate::types::ChallengeStatus::Active,
            initial_balance: 0.0,
            day_start_equity: 0.0,
            lowest_equity_overall: 0.0,
            current_balance: 0.0,
            current_equity: 0.0,
            fail_reason: None,
        };
        let metrics = challenge_metrics(&details, 100.0);
        assert_eq!(metrics.daily_drawdown_pct, 0.0);
        assert_eq!(metrics.profit_pct, 0.0);
    }
}
