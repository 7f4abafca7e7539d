//! Order Execution Gateway
//!
//! Validates and submits open/close/modify/cancel requests and classifies
//! the backend's answers into user-facing outcomes:
//! - Pre-submit validation never touches the network
//! - Close and modify are priced from the live cache, never from stale values
//! - One in-flight flag per operation type blocks double submission
//! - Batch operations attempt every item and report an aggregate

use crate::error::AppError;
use crate::services::metrics::trade_pnl;
use crate::services::policy::{self, OrderPolicy, ValidationError};
use crate::services::price_cache::PriceCache;
use crate::sources::trading_api::TradingApi;
use crate::types::{
    CancelOrderRequest, CloseTradeRequest, ModifyTradeRequest, Notification, OpenTradeRequest,
    OpenTradeResponse, OrderRequest, PriceMap, Trade, TradingAccount,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Gateway errors. Business rejections of an open are not errors; see
/// [`OrderOutcome`].
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No price data for {0}")]
    NoPriceData(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("A {0} request is already in flight")]
    InFlight(&'static str),

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] AppError),
}

impl OrderError {
    /// Toast for this error.
    pub fn notification(&self) -> Notification {
        match self {
            OrderError::Validation(ValidationError::StopLossRequired) => {
                Notification::warning("Stop Loss Required", self.to_string())
            }
            OrderError::Validation(ValidationError::MarketClosed(_)) => {
                Notification::error("Market Closed", self.to_string())
            }
            OrderError::InFlight(_) => Notification::info("Please Wait", self.to_string()),
            _ => Notification::error("Order Failed", self.to_string()),
        }
    }
}

// =============================================================================
// Outcome classification
// =============================================================================

const DRAWDOWN_CODES: [&str; 2] = ["DRAWDOWN_BREACH", "DAILY_DRAWDOWN_BREACH"];
const SIZE_CODES: [&str; 2] = ["MAX_LOTS_EXCEEDED", "MIN_LOTS_REQUIRED"];

const GENERIC_FAILURE: &str = "Failed to place order";

/// What happened to a submitted open request.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Accepted { trade: Option<Trade>, message: Option<String> },
    /// Challenge drawdown rule violated; the account is likely FAILED now.
    ChallengeBreach { code: String, message: String },
    /// Lot size outside the allowed range. Correctable, no refresh.
    SizeRejected { code: String, message: String },
    /// The challenge account failed as a side effect of this order.
    AccountFailed { reason: String, message: String },
    Rejected { message: String },
}

impl OrderOutcome {
    /// Classify an open response. `accountFailed` wins over any code.
    pub fn classify(response: OpenTradeResponse) -> Self {
        let message = response.message.clone();

        if response.account_failed {
            let reason = response
                .fail_reason
                .clone()
                .or_else(|| message.clone())
                .unwrap_or_else(|| "Challenge account failed".to_string());
            return OrderOutcome::AccountFailed {
                reason,
                message: message.unwrap_or_else(|| "Your challenge account has failed".to_string()),
            };
        }

        if response.success {
            return OrderOutcome::Accepted {
                trade: response.trade,
                message,
            };
        }

        let message = message.unwrap_or_else(|| GENERIC_FAILURE.to_string());
        match response.code {
            Some(code) if DRAWDOWN_CODES.contains(&code.as_str()) => {
                OrderOutcome::ChallengeBreach { code, message }
            }
            Some(code) if SIZE_CODES.contains(&code.as_str()) => {
                OrderOutcome::SizeRejected { code, message }
            }
            _ => OrderOutcome::Rejected { message },
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, OrderOutcome::Accepted { .. })
    }

    /// Whether open/pending/summary should be re-fetched right away.
    pub fn should_refresh(&self) -> bool {
        matches!(
            self,
            OrderOutcome::Accepted { .. }
                | OrderOutcome::ChallengeBreach { .. }
                | OrderOutcome::AccountFailed { .. }
        )
    }

    pub fn notification(&self) -> Notification {
        match self {
            OrderOutcome::Accepted { trade, message } => {
                let body = match (trade, message) {
                    (Some(t), _) => format!("{} {} {}", t.side, t.quantity, t.symbol),
                    (None, Some(m)) => m.clone(),
                    (None, None) => "Order placed".to_string(),
                };
                Notification::success("Order Placed", body)
            }
            OrderOutcome::ChallengeBreach { message, .. } => {
                Notification::error("Challenge Rule Violated", message.clone()).acknowledged()
            }
            OrderOutcome::SizeRejected { message, .. } => {
                Notification::warning("Invalid Lot Size", message.clone())
            }
            OrderOutcome::AccountFailed { reason, .. } => {
                Notification::error("Challenge Failed", reason.clone()).acknowledged()
            }
            OrderOutcome::Rejected { message } => Notification::error("Order Failed", message.clone()),
        }
    }
}

// =============================================================================
// Batch operations
// =============================================================================

/// Which open trades `close_all` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAllFilter {
    All,
    Profitable,
    Losing,
}

impl CloseAllFilter {
    fn matches(&self, trade: &Trade, prices: &PriceMap) -> bool {
        match self {
            CloseAllFilter::All => true,
            CloseAllFilter::Profitable => trade_pnl(trade, prices) > 0.0,
            CloseAllFilter::Losing => trade_pnl(trade, prices) < 0.0,
        }
    }
}

/// Aggregate result of a batch operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub attempted: usize,
    pub succeeded: usize,
}

impl BatchOutcome {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }

    pub fn message(&self) -> String {
        format!("Closed {} trade(s)", self.succeeded)
    }

    pub fn notification(&self) -> Notification {
        if self.failed() == 0 {
            Notification::success("Positions Closed", self.message())
        } else {
            Notification::warning(
                "Partially Closed",
                format!("{} ({} of {} failed)", self.message(), self.failed(), self.attempted),
            )
        }
    }

    fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        }
    }
}

// =============================================================================
// In-flight guard
// =============================================================================

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, operation: &'static str) -> Result<Self, OrderError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OrderError::InFlight(operation))?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct InFlight {
    open: AtomicBool,
    close: AtomicBool,
    modify: AtomicBool,
    cancel: AtomicBool,
    batch: AtomicBool,
}

// =============================================================================
// Gateway
// =============================================================================

/// Submits order operations against the backend.
pub struct OrderGateway {
    api: Arc<dyn TradingApi>,
    prices: Arc<PriceCache>,
    in_flight: InFlight,
}

impl OrderGateway {
    pub fn new(api: Arc<dyn TradingApi>, prices: Arc<PriceCache>) -> Self {
        Self {
            api,
            prices,
            in_flight: InFlight::default(),
        }
    }

    /// Validate and submit a new market or pending order.
    ///
    /// A `StopLossRequired` error means the caller should prompt for a stop
    /// loss and resubmit with [`OrderRequest::with_stop_loss`].
    pub async fn place_order(
        &self,
        account: &TradingAccount,
        order: &OrderRequest,
    ) -> Result<OrderOutcome, OrderError> {
        let quote = self.prices.get(&order.symbol);
        policy::validate(order, &OrderPolicy::for_account(account), quote.as_ref())?;
        let (bid, ask) = match quote.and_then(|q| q.bid.zip(q.ask)) {
            Some(pair) => pair,
            None => return Err(ValidationError::MarketClosed(order.symbol.clone()).into()),
        };

        let _guard = InFlightGuard::acquire(&self.in_flight.open, "open")?;
        let request = OpenTradeRequest::build(account, order, bid, ask);
        let key = Uuid::new_v4().to_string();
        debug!("Submitting {} {} {} key={}", request.order_type, order.symbol, order.quantity, key);

        let response = self.api.open_trade(&request, &key).await?;
        let outcome = OrderOutcome::classify(response);
        match &outcome {
            OrderOutcome::Accepted { .. } => info!("Order accepted: {} {}", order.side, order.symbol),
            other => warn!("Order not accepted: {:?}", other),
        }
        Ok(outcome)
    }

    /// Close an open trade at the current price. Returns realized P&L when
    /// the backend reports it.
    pub async fn close_trade(&self, trade: &Trade) -> Result<Option<f64>, OrderError> {
        let _guard = InFlightGuard::acquire(&self.in_flight.close, "close")?;
        self.close_unguarded(trade).await
    }

    async fn close_unguarded(&self, trade: &Trade) -> Result<Option<f64>, OrderError> {
        let (bid, ask) = self.live_price(&trade.symbol)?;
        let request = CloseTradeRequest {
            trade_id: trade.id.clone(),
            bid,
            ask,
        };
        let response = self.api.close_trade(&request).await?;
        if !response.success {
            return Err(OrderError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "Failed to close trade".to_string()),
            ));
        }
        info!("Closed trade {} ({})", trade.id, trade.symbol);
        Ok(response.pnl())
    }

    /// Change or remove a trade's stop loss and take profit.
    pub async fn modify_sl_tp(
        &self,
        account: &TradingAccount,
        trade: &Trade,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<(), OrderError> {
        policy::validate_modify(stop_loss, &OrderPolicy::for_account(account))?;
        let (bid, ask) = self.live_price(&trade.symbol)?;

        let _guard = InFlightGuard::acquire(&self.in_flight.modify, "modify")?;
        let request = ModifyTradeRequest {
            trade_id: trade.id.clone(),
            sl: stop_loss,
            tp: take_profit,
            bid,
            ask,
        };
        let ack = self.api.modify_trade(&request).await?;
        if !ack.success {
            return Err(OrderError::Rejected(
                ack.message
                    .unwrap_or_else(|| "Failed to modify trade".to_string()),
            ));
        }
        Ok(())
    }

    /// Cancel a pending order.
    pub async fn cancel_pending_order(&self, order_id: &str) -> Result<(), OrderError> {
        let _guard = InFlightGuard::acquire(&self.in_flight.cancel, "cancel")?;
        self.cancel_unguarded(order_id).await
    }

    async fn cancel_unguarded(&self, order_id: &str) -> Result<(), OrderError> {
        let request = CancelOrderRequest {
            trade_id: order_id.to_string(),
        };
        let ack = self.api.cancel_order(&request).await?;
        if !ack.success {
            return Err(OrderError::Rejected(
                ack.message
                    .unwrap_or_else(|| "Failed to cancel order".to_string()),
            ));
        }
        Ok(())
    }

    /// Close every open trade matching `filter`, one call each.
    pub async fn close_all(
        &self,
        trades: &[Trade],
        filter: CloseAllFilter,
    ) -> Result<BatchOutcome, OrderError> {
        let _guard = InFlightGuard::acquire(&self.in_flight.batch, "close all")?;
        let prices = self.prices.snapshot();
        let targets: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.is_open() && filter.matches(t, &prices))
            .collect();

        let mut outcome = BatchOutcome::default();
        for trade in targets {
            let result = self.close_unguarded(trade).await;
            if let Err(e) = &result {
                warn!("Close all: {} failed: {}", trade.id, e);
            }
            outcome.record(result.is_ok());
        }
        info!("Close all ({:?}): {}/{}", filter, outcome.succeeded, outcome.attempted);
        Ok(outcome)
    }

    /// Close every open trade and cancel every pending order.
    pub async fn kill_switch(
        &self,
        open_trades: &[Trade],
        pending_orders: &[Trade],
    ) -> Result<BatchOutcome, OrderError> {
        let _guard = InFlightGuard::acquire(&self.in_flight.batch, "kill switch")?;
        let mut outcome = BatchOutcome::default();

        for trade in open_trades {
            let result = self.close_unguarded(trade).await;
            if let Err(e) = &result {
                warn!("Kill switch: close {} failed: {}", trade.id, e);
            }
            outcome.record(result.is_ok());
        }
        for order in pending_orders {
            let result = self.cancel_unguarded(&order.id).await;
            if let Err(e) = &result {
                warn!("Kill switch: cancel {} failed: {}", order.id, e);
            }
            outcome.record(result.is_ok());
        }

        warn!("Kill switch: {}/{} succeeded", outcome.succeeded, outcome.attempted);
        Ok(outcome)
    }

    fn live_price(&self, symbol: &str) -> Result<(f64, f64), OrderError> {
        self.prices
            .get(symbol)
            .and_then(|q| q.bid.zip(q.ask))
            .ok_or_else(|| OrderError::NoPriceData(symbol.to_string()))
    }
}
