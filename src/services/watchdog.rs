//! SL/TP watchdog.
//!
//! Asks the backend to evaluate stop loss, take profit and stop-out against
//! the full price cache, then turns the trades it closed into notifications
//! for the active account.

use crate::error::Result;
use crate::sources::trading_api::TradingApi;
use crate::types::{ClosedTradeEvent, CloseReason, Notification, PriceMap, SlTpCheckRequest};
use tracing::{debug, info};

/// Result of one watchdog pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchdogReport {
    /// Toast plus acknowledgement per closed trade of the active account.
    pub notifications: Vec<Notification>,
    /// Closed trades that belonged to the active account.
    pub closed_for_active: usize,
    /// Whether the backend closed anything at all.
    pub refresh: bool,
}

/// Run one check. Returns an empty report without calling the backend when
/// there is nothing open or no price known yet.
pub async fn check_once(
    api: &dyn TradingApi,
    active_account_id: &str,
    open_trade_count: usize,
    prices: &PriceMap,
) -> Result<WatchdogReport> {
    if open_trade_count == 0 || prices.is_empty() {
        return Ok(WatchdogReport::default());
    }

    let response = api
        .check_sltp(&SlTpCheckRequest {
            prices: prices.clone(),
        })
        .await?;

    let mut report = WatchdogReport {
        refresh: response.closed_count > 0 || !response.closed_trades.is_empty(),
        ..Default::default()
    };

    for event in &response.closed_trades {
        // Trades without an owner are attributed to the active account.
        if let Some(owner) = event.trading_account_id.as_deref() {
            if owner != active_account_id {
                debug!("Skipping closure for other account {}", owner);
                continue;
            }
        }

        let reason = event.close_reason();
        info!(
            "{} closed by {}",
            event.symbol,
            reason.map(|r| r.to_string()).unwrap_or_else(|| "server".to_string())
        );
        let toast = closure_notification(event, reason);
        report.notifications.push(toast.clone());
        report.notifications.push(toast.acknowledged());
        report.closed_for_active += 1;
    }

    Ok(report)
}

/// Notification for one server-side closure.
pub fn closure_notification(event: &ClosedTradeEvent, reason: Option<CloseReason>) -> Notification {
    let pnl = format!("P&L: {:.2}", event.pnl);
    match reason {
        Some(CloseReason::StopLoss) => Notification::warning(
            "Stop Loss Hit",
            format!("{} closed at stop loss. {}", event.symbol, pnl),
        ),
        Some(CloseReason::TakeProfit) => Notification::success(
            "Take Profit Hit",
            format!("{} closed at take profit. {}", event.symbol, pnl),
        ),
        Some(CloseReason::StopOut) => Notification::error(
            "Stop Out",
            format!("{} closed by stop out. {}", event.symbol, pnl),
        ),
        _ => Notification::info("Trade Closed", format!("{} closed. {}", event.symbol, pnl)),
    }
}
