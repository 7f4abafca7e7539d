//! Client-side pre-trade policy.
//!
//! The backend re-validates everything; these checks only stop requests
//! that are certain to fail before they hit the network. The same
//! [`validate`] runs on first submit and on every resubmit.

use crate::types::{ChallengeRules, OrderRequest, Quote, TradeSide, TradingAccount};
use thiserror::Error;

/// Reasons an order is blocked before submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Market closed or no price data for {0}")]
    MarketClosed(String),

    #[error("Pending orders need an entry price")]
    MissingEntryPrice,

    #[error("Stop loss is mandatory for this account")]
    StopLossRequired,

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("No active account selected")]
    NoActiveAccount,
}

/// Rules the client mirrors from the backend for one account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPolicy {
    pub stop_loss_mandatory: bool,
}

impl OrderPolicy {
    /// Policy for a regular account.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: &ChallengeRules) -> Self {
        Self {
            stop_loss_mandatory: rules.stop_loss_mandatory,
        }
    }

    pub fn for_account(account: &TradingAccount) -> Self {
        account.rules().map(Self::from_rules).unwrap_or_default()
    }
}

/// Validate an order against a policy and the current quote.
pub fn validate(
    order: &OrderRequest,
    policy: &OrderPolicy,
    quote: Option<&Quote>,
) -> Result<(), ValidationError> {
    match quote {
        Some(q) if q.is_tradable() => {}
        _ => return Err(ValidationError::MarketClosed(order.symbol.clone())),
    }

    if !(order.quantity.is_finite() && order.quantity > 0.0) {
        return Err(ValidationError::InvalidQuantity);
    }

    if order.is_pending() && order.entry_price.is_none() {
        return Err(ValidationError::MissingEntryPrice);
    }

    if policy.stop_loss_mandatory && order.stop_loss.is_none() {
        return Err(ValidationError::StopLossRequired);
    }

    Ok(())
}

/// Margin the backend will reserve for `order`, for the order panel preview.
///
/// Market orders price at the side they fill on (BUY at ask, SELL at bid),
/// pending orders at their entry price. `None` until a usable price exists.
pub fn required_margin(order: &OrderRequest, quote: Option<&Quote>, leverage: f64) -> Option<f64> {
    let price = if order.is_pending() {
        order.entry_price
    } else {
        quote.and_then(|q| match order.side {
            TradeSide::Buy => q.ask,
            TradeSide::Sell => q.bid,
        })
    }?;
    if leverage <= 0.0 {
        return None;
    }
    Some(order.quantity * order.category.default_contract_size() * price / leverage)
}

/// Validate an SL/TP modification against a policy.
pub fn validate_modify(stop_loss: Option<f64>, policy: &OrderPolicy) -> Result<(), ValidationError> {
    if policy.stop_loss_mandatory && stop_loss.is_none() {
        return Err(ValidationError::StopLossRequired);
    }
    Ok(())
}
