//! Trade Types
//!
//! Open positions, pending orders and closed history share one wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// +1 for BUY, -1 for SELL.
    pub fn sign(&self) -> f64 {
        match self {
            TradeSide::Buy => 1.0,
            TradeSide::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of a trade document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    Pending,
    Closed,
}

/// Pending order flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingOrderType {
    BuyLimit,
    BuyStop,
    SellLimit,
    SellStop,
}

impl PendingOrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingOrderType::BuyLimit => "BUY_LIMIT",
            PendingOrderType::BuyStop => "BUY_STOP",
            PendingOrderType::SellLimit => "SELL_LIMIT",
            PendingOrderType::SellStop => "SELL_STOP",
        }
    }

    /// Parse a wire order type. `MARKET` and anything unknown are not
    /// pending flavors and yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BUY_LIMIT" => Some(PendingOrderType::BuyLimit),
            "BUY_STOP" => Some(PendingOrderType::BuyStop),
            "SELL_LIMIT" => Some(PendingOrderType::SellLimit),
            "SELL_STOP" => Some(PendingOrderType::SellStop),
            _ => None,
        }
    }

    pub fn side(&self) -> TradeSide {
        match self {
            PendingOrderType::BuyLimit | PendingOrderType::BuyStop => TradeSide::Buy,
            PendingOrderType::SellLimit | PendingOrderType::SellStop => TradeSide::Sell,
        }
    }
}

/// Why a trade left the open book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "TP")]
    TakeProfit,
    StopOut,
    Admin,
    User,
}

impl CloseReason {
    /// Parse the loosely-typed trigger strings the SL/TP check returns.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SL" | "STOP_LOSS" => Some(CloseReason::StopLoss),
            "TP" | "TAKE_PROFIT" => Some(CloseReason::TakeProfit),
            "STOP_OUT" | "STOPOUT" => Some(CloseReason::StopOut),
            "ADMIN" => Some(CloseReason::Admin),
            "USER" | "MANUAL" => Some(CloseReason::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::StopLoss => write!(f, "SL"),
            CloseReason::TakeProfit => write!(f, "TP"),
            CloseReason::StopOut => write!(f, "STOP_OUT"),
            CloseReason::Admin => write!(f, "ADMIN"),
            CloseReason::User => write!(f, "USER"),
        }
    }
}

fn default_contract_size() -> f64 {
    100_000.0
}

// One odd element must not fail a whole trade list, so these two fields
// fall back to `None` on values we do not model.

fn lenient_order_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PendingOrderType>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(PendingOrderType::parse))
}

fn lenient_close_reason<'de, D: Deserializer<'de>>(d: D) -> Result<Option<CloseReason>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.as_deref().and_then(CloseReason::parse))
}

// =============================================================================
// Trade
// =============================================================================

/// A position or pending order as mirrored from the backend.
///
/// Floating P&L is never stored here; see `services::metrics::trade_pnl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(rename = "_id", alias = "tradeId")]
    pub id: String,
    pub symbol: String,
    #[serde(alias = "type")]
    pub side: TradeSide,
    pub quantity: f64,
    #[serde(default)]
    pub open_price: f64,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
    #[serde(default)]
    pub margin_used: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub swap: f64,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default, deserialize_with = "lenient_order_type")]
    pub order_type: Option<PendingOrderType>,
    #[serde(default)]
    pub pending_price: Option<f64>,
    pub status: TradeStatus,
    #[serde(default)]
    pub trading_account_id: Option<String>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub close_price: Option<f64>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub realized_pnl: Option<f64>,
    #[serde(default, deserialize_with = "lenient_close_reason")]
    pub closed_by: Option<CloseReason>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_pending(&self) -> bool {
        self.status == TradeStatus::Pending
    }
}

/// Envelope of the `/trade/open|pending|history` reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TradesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub trades: Vec<Trade>,
    #[serde(default)]
    pub message: Option<String>,
}
