//! Shared fixtures for integration tests: a recording in-memory backend and
//! builders for the wire types.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tradesync::error::{AppError, Result};
use tradesync::sources::TradingApi;
use tradesync::types::*;

/// In-memory `TradingApi` that records every call.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<String>>,
    pub regular_accounts: Mutex<Vec<RegularAccountDto>>,
    pub challenge_accounts: Mutex<Vec<ChallengeAccountDto>>,
    pub open_trades: Mutex<HashMap<String, Vec<Trade>>>,
    pub pending_orders: Mutex<HashMap<String, Vec<Trade>>>,
    pub history: Mutex<HashMap<String, Vec<Trade>>>,
    pub summary: Mutex<Option<AccountSummary>>,
    pub instruments: Mutex<Vec<Instrument>>,
    pub open_response: Mutex<Option<OpenTradeResponse>>,
    pub sltp_response: Mutex<SlTpCheckResponse>,
    pub fail_close: Mutex<HashSet<String>>,
    pub fail_regular_accounts: AtomicBool,
    pub fail_challenge_accounts: AtomicBool,
    /// Per-account delay applied to open-trade reads.
    pub open_delay: Mutex<HashMap<String, Duration>>,
    pub opened: Mutex<Vec<(OpenTradeRequest, String)>>,
    pub closed: Mutex<Vec<CloseTradeRequest>>,
    pub modified: Mutex<Vec<ModifyTradeRequest>>,
    pub cancelled: Mutex<Vec<CancelOrderRequest>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Calls that referenced `account_id`.
    pub fn calls_for(&self, account_id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.ends_with(&format!(":{}", account_id)))
            .count()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn add_regular(&self, dto: RegularAccountDto) {
        self.regular_accounts.lock().unwrap().push(dto);
    }

    pub fn add_challenge(&self, dto: ChallengeAccountDto) {
        self.challenge_accounts.lock().unwrap().push(dto);
    }

    pub fn set_open(&self, account_id: &str, trades: Vec<Trade>) {
        self.open_trades
            .lock()
            .unwrap()
            .insert(account_id.to_string(), trades);
    }

    pub fn set_pending(&self, account_id: &str, trades: Vec<Trade>) {
        self.pending_orders
            .lock()
            .unwrap()
            .insert(account_id.to_string(), trades);
    }

    pub fn set_history(&self, account_id: &str, trades: Vec<Trade>) {
        self.history
            .lock()
            .unwrap()
            .insert(account_id.to_string(), trades);
    }
}

#[async_trait]
impl TradingApi for FakeApi {
    async fn fetch_trading_accounts(&self, user_id: &str) -> Result<Vec<RegularAccountDto>> {
        self.record(format!("trading_accounts:{}", user_id));
        if self.fail_regular_accounts.load(Ordering::SeqCst) {
            return Err(AppError::Http {
                status: 500,
                message: "boom".to_string(),
            });
        }
        Ok(self.regular_accounts.lock().unwrap().clone())
    }

    async fn fetch_challenge_accounts(&self, user_id: &str) -> Result<Vec<ChallengeAccountDto>> {
        self.record(format!("challenge_accounts:{}", user_id));
        if self.fail_challenge_accounts.load(Ordering::SeqCst) {
            return Err(AppError::Decode("not json".to_string()));
        }
        Ok(self.challenge_accounts.lock().unwrap().clone())
    }

    async fn fetch_open_trades(&self, account_id: &str) -> Result<Vec<Trade>> {
        self.record(format!("open:{}", account_id));
        let delay = self.open_delay.lock().unwrap().get(account_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .open_trades
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_pending_orders(&self, account_id: &str) -> Result<Vec<Trade>> {
        self.record(format!("pending:{}", account_id));
        Ok(self
            .pending_orders
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_trade_history(&self, account_id: &str, _limit: u32) -> Result<Vec<Trade>> {
        self.record(format!("history:{}", account_id));
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_account_summary(&self, account_id: &str, _prices: &PriceMap) -> Result<AccountSummary> {
        self.record(format!("summary:{}", account_id));
        self.summary
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Api("Summary unavailable".to_string()))
    }

    async fn fetch_instruments(&self) -> Result<Vec<Instrument>> {
        self.record("instruments".to_string());
        Ok(self.instruments.lock().unwrap().clone())
    }

    async fn open_trade(&self, request: &OpenTradeRequest, idempotency_key: &str) -> Result<OpenTradeResponse> {
        self.record(format!("open_trade:{}", request.symbol));
        self.opened
            .lock()
            .unwrap()
            .push((request.clone(), idempotency_key.to_string()));
        Ok(self.open_response.lock().unwrap().clone().unwrap_or(OpenTradeResponse {
            success: true,
            ..Default::default()
        }))
    }

    async fn close_trade(&self, request: &CloseTradeRequest) -> Result<CloseTradeResponse> {
        self.record(format!("close:{}", request.trade_id));
        self.closed.lock().unwrap().push(request.clone());
        if self.fail_close.lock().unwrap().contains(&request.trade_id) {
            return Err(AppError::Http {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(CloseTradeResponse {
            success: true,
            realized_pnl: Some(10.0),
            ..Default::default()
        })
    }

    async fn modify_trade(&self, request: &ModifyTradeRequest) -> Result<ApiAck> {
        self.record(format!("modify:{}", request.trade_id));
        self.modified.lock().unwrap().push(request.clone());
        Ok(ApiAck {
            success: true,
            message: None,
        })
    }

    async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<ApiAck> {
        self.record(format!("cancel:{}", request.trade_id));
        self.cancelled.lock().unwrap().push(request.clone());
        Ok(ApiAck {
            success: true,
            message: None,
        })
    }

    async fn check_sltp(&self, _request: &SlTpCheckRequest) -> Result<SlTpCheckResponse> {
        self.record("check_sltp".to_string());
        Ok(std::mem::take(&mut *self.sltp_response.lock().unwrap()))
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn regular_dto(id: &str, balance: f64) -> RegularAccountDto {
    serde_json::from_value(json!({
        "_id": id,
        "accountId": format!("R-{}", id),
        "balance": balance,
        "credit": 0.0,
        "leverage": "1:100"
    }))
    .unwrap()
}

pub fn challenge_dto(id: &str, stop_loss_mandatory: bool) -> ChallengeAccountDto {
    serde_json::from_value(json!({
        "_id": id,
        "accountId": format!("C-{}", id),
        "currentStep": 1,
        "challengeId": {
            "name": "Two Step 10K",
            "rules": {
                "maxDailyDrawdownPercent": 5.0,
                "maxOverallDrawdownPercent": 10.0,
                "profitTargetPhase1Percent": 8.0,
                "stopLossMandatory": stop_loss_mandatory
            }
        },
        "status": "ACTIVE",
        "initialBalance": 10000.0,
        "currentBalance": 10000.0,
        "currentEquity": 10000.0,
        "dayStartEquity": 10000.0,
        "lowestEquityOverall": 10000.0,
        "leverage": "1:50"
    }))
    .unwrap()
}

pub fn regular_account(id: &str, balance: f64) -> TradingAccount {
    regular_dto(id, balance).into()
}

pub fn challenge_account(id: &str, stop_loss_mandatory: bool) -> TradingAccount {
    challenge_dto(id, stop_loss_mandatory).into()
}

pub fn open_trade(id: &str, symbol: &str, side: TradeSide, quantity: f64, open_price: f64) -> Trade {
    Trade {
        id: id.to_string(),
        symbol: symbol.to_string(),
        side,
        quantity,
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

pub fn pending_order(id: &str, symbol: &str, kind: PendingOrderType, price: f64) -> Trade {
    Trade {
        status: TradeStatus::Pending,
        order_type: Some(kind),
        pending_price: Some(price),
        ..open_trade(id, symbol, kind.side(), 0.1, price)
    }
}

pub fn prices(entries: &[(&str, f64, f64)]) -> PriceMap {
    entries
        .iter()
        .map(|(symbol, bid, ask)| (symbol.to_string(), Quote::new(*bid, *ask)))
        .collect()
}
