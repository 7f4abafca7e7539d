//! Order Types
//!
//! Client-side order intents, the exact request bodies sent to the trading
//! API, and the responses it returns.

use super::account::TradingAccount;
use super::instrument::InstrumentCategory;
use super::price::PriceMap;
use super::trade::{CloseReason, PendingOrderType, Trade, TradeSide};
use serde::{Deserialize, Serialize};

// =============================================================================
// Order intent
// =============================================================================

/// Market or pending execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    Market,
    Limit,
    Stop,
}

/// What the user asked for on the order panel.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub category: InstrumentCategory,
    pub side: TradeSide,
    pub execution: Execution,
    pub quantity: f64,
    /// Entry price for limit/stop orders.
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl OrderRequest {
    pub fn market(symbol: &str, category: InstrumentCategory, side: TradeSide, quantity: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            category,
            side,
            execution: Execution::Market,
            quantity,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    pub fn pending(
        symbol: &str,
        category: InstrumentCategory,
        side: TradeSide,
        execution: Execution,
        quantity: f64,
        entry_price: Option<f64>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            category,
            side,
            execution,
            quantity,
            entry_price,
            stop_loss: None,
            take_profit: None,
        }
    }

    /// Resubmission path after a mandatory stop-loss prompt.
    pub fn with_stop_loss(mut self, stop_loss: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: f64) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.execution != Execution::Market
    }

    /// `MARKET`, or `BUY_LIMIT` / `SELL_STOP` style for pending orders.
    pub fn order_type(&self) -> &'static str {
        self.pending_type().map_or("MARKET", |kind| kind.as_str())
    }

    pub fn pending_type(&self) -> Option<PendingOrderType> {
        match (self.side, self.execution) {
            (_, Execution::Market) => None,
            (TradeSide::Buy, Execution::Limit) => Some(PendingOrderType::BuyLimit),
            (TradeSide::Buy, Execution::Stop) => Some(PendingOrderType::BuyStop),
            (TradeSide::Sell, Execution::Limit) => Some(PendingOrderType::SellLimit),
            (TradeSide::Sell, Execution::Stop) => Some(PendingOrderType::SellStop),
        }
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// `POST /trade/open` body. Exactly one account id field is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTradeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trading_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_account_id: Option<String>,
    pub symbol: String,
    pub segment: String,
    pub side: TradeSide,
    pub order_type: String,
    pub quantity: f64,
    pub bid: f64,
    pub ask: f64,
    pub leverage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp: Option<f64>,
}

impl OpenTradeRequest {
    /// Build the wire body for `order` against `account`.
    ///
    /// Pending orders send the entry price as both bid and ask.
    pub fn build(account: &TradingAccount, order: &OrderRequest, bid: f64, ask: f64) -> Self {
        let (bid, ask) = match (order.is_pending(), order.entry_price) {
            (true, Some(entry)) => (entry, entry),
            _ => (bid, ask),
        };
        let (trading_account_id, challenge_account_id) = if account.is_challenge() {
            (None, Some(account.id.clone()))
        } else {
            (Some(account.id.clone()), None)
        };

        Self {
            trading_account_id,
            challenge_account_id,
            symbol: order.symbol.clone(),
            segment: order.category.segment().to_string(),
            side: order.side,
            order_type: order.order_type().to_string(),
            quantity: order.quantity,
            bid,
            ask,
            leverage: account.leverage.clone(),
            sl: order.stop_loss,
            tp: order.take_profit,
        }
    }
}

/// `POST /trade/close` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTradeRequest {
    pub trade_id: String,
    pub bid: f64,
    pub ask: f64,
}

/// `PUT /trade/modify` body. Current prices ride along for the server's
/// SL/TP distance checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyTradeRequest {
    pub trade_id: String,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub bid: f64,
    pub ask: f64,
}

/// `POST /trade/cancel` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    pub trade_id: String,
}

/// `POST /trade/check-sltp` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlTpCheckRequest {
    pub prices: PriceMap,
}

// =============================================================================
// Responses
// =============================================================================

/// `POST /trade/open` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTradeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub trade: Option<Trade>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub account_failed: bool,
    #[serde(default)]
    pub fail_reason: Option<String>,
}

/// `POST /trade/close` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTradeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub trade: Option<Trade>,
    #[serde(default)]
    pub realized_pnl: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CloseTradeResponse {
    /// Realized P&L from either response shape.
    pub fn pnl(&self) -> Option<f64> {
        self.realized_pnl
            .or_else(|| self.trade.as_ref().and_then(|t| t.realized_pnl))
    }
}

/// Plain `{success, message}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// One trade the backend closed during an SL/TP check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTradeEvent {
    pub symbol: String,
    #[serde(default)]
    pub pnl: f64,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub closed_by: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub trading_account_id: Option<String>,
}

impl ClosedTradeEvent {
    /// First of `trigger`, `closedBy`, `reason` that names a known trigger.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.labels().find_map(CloseReason::parse)
    }

    fn labels(&self) -> impl Iterator<Item = &str> {
        [&self.trigger, &self.closed_by, &self.reason]
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

/// `POST /trade/check-sltp` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlTpCheckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub closed_count: u32,
    #[serde(default)]
    pub closed_trades: Vec<ClosedTradeEvent>,
}
