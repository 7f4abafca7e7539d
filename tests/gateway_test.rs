//! Tests for the order execution gateway
//!
//! Tests cover:
//! - Pre-submit validation and the mandatory stop-loss flow
//! - Request shapes sent to the backend
//! - Close/modify pricing
//! - Batch operations with partial failure

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use tradesync::services::{
    CloseAllFilter, OrderError, OrderGateway, OrderOutcome, PriceCache, ValidationError,
};
use tradesync::types::*;

fn setup() -> (Arc<FakeApi>, Arc<PriceCache>, OrderGateway) {
    let api = Arc::new(FakeApi::new());
    let cache = PriceCache::new();
    cache.merge_snapshot(prices(&[("EURUSD", 1.1, 1.1002), ("GBPUSD", 1.27, 1.2702)]));
    let gateway = OrderGateway::new(api.clone(), cache.clone());
    (api, cache, gateway)
}

fn market_buy() -> OrderRequest {
    OrderRequest::market("EURUSD", InstrumentCategory::Forex, TradeSide::Buy, 0.1)
}

// =============================================================================
// Place order
// =============================================================================

mod place_order_tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_loss_gate_then_resubmit() {
        let (api, _cache, gateway) = setup();
        let account = challenge_account("ch-1", true);

        let result = gateway.place_order(&account, &market_buy()).await;
        assert!(matches!(
            result,
            Err(OrderError::Validation(ValidationError::StopLossRequired))
        ));
        assert!(api.calls().is_empty());

        let outcome = gateway
            .place_order(&account, &market_buy().with_stop_loss(1.095))
            .await
            .unwrap();
        assert!(outcome.is_accepted());

        let opened = api.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        let (body, key) = &opened[0];
        assert_eq!(body.challenge_account_id.as_deref(), Some("ch-1"));
        assert_eq!(body.trading_account_id, None);
        assert_eq!(body.sl, Some(1.095));
        assert_eq!(body.leverage, "1:50");
        assert!(uuid::Uuid::parse_str(key).is_ok());
    }

    #[tokio::test]
    async fn test_market_closed_blocks_without_call() {
        let (api, _cache, gateway) = setup();
        let order = OrderRequest::market("XAUUSD", InstrumentCategory::Metals, TradeSide::Sell, 1.0);

        let result = gateway.place_order(&regular_account("acc-1", 1000.0), &order).await;
        assert!(matches!(
            result,
            Err(OrderError::Validation(ValidationError::MarketClosed(ref s))) if s == "XAUUSD"
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pending_order_body() {
        let (api, _cache, gateway) = setup();
        let order = OrderRequest::pending(
            "EURUSD",
            InstrumentCategory::Forex,
            TradeSide::Sell,
            Execution::Limit,
            0.2,
            Some(1.105),
        );

        gateway
            .place_order(&regular_account("acc-1", 1000.0), &order)
            .await
            .unwrap();

        let opened = api.opened.lock().unwrap();
        let body = serde_json::to_value(&opened[0].0).unwrap();
        assert_eq!(body["tradingAccountId"], "acc-1");
        assert_eq!(body["orderType"], "SELL_LIMIT");
        assert_eq!(body["bid"], 1.105);
        assert_eq!(body["ask"], 1.105);
        assert!(body.get("challengeAccountId").is_none());
    }

    #[tokio::test]
    async fn test_each_submit_gets_fresh_idempotency_key() {
        let (api, _cache, gateway) = setup();
        let account = regular_account("acc-1", 1000.0);
        gateway.place_order(&account, &market_buy()).await.unwrap();
        gateway.place_order(&account, &market_buy()).await.unwrap();

        let opened = api.opened.lock().unwrap();
        assert_ne!(opened[0].1, opened[1].1);
    }

    #[tokio::test]
    async fn test_business_rejection_is_an_outcome() {
        let (api, _cache, gateway) = setup();
        *api.open_response.lock().unwrap() = Some(
            serde_json::from_value(json!({
                "success": false,
                "code": "MAX_LOTS_EXCEEDED",
                "message": "Maximum 5 lots per trade"
            }))
            .unwrap(),
        );

        let outcome = gateway
            .place_order(&regular_account("acc-1", 1000.0), &market_buy())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            OrderOutcome::SizeRejected {
                code: "MAX_LOTS_EXCEEDED".to_string(),
                message: "Maximum 5 lots per trade".to_string(),
            }
        );
        assert!(!outcome.should_refresh());
        assert_eq!(outcome.notification().notification_type, NotificationType::Warning);
    }
}

// =============================================================================
// Close / modify / cancel
// =============================================================================

mod position_tests {
    use super::*;

    #[tokio::test]
    async fn test_close_sends_live_prices() {
        let (api, _cache, gateway) = setup();
        let trade = open_trade("t1", "EURUSD", TradeSide::Buy, 0.1, 1.09);

        let pnl = gateway.close_trade(&trade).await.unwrap();
        assert_eq!(pnl, Some(10.0));

        let closed = api.closed.lock().unwrap();
        assert_eq!(
            closed[0],
            CloseTradeRequest {
                trade_id: "t1".to_string(),
                bid: 1.1,
                ask: 1.1002,
            }
        );
    }

    #[tokio::test]
    async fn test_close_without_price_is_blocked() {
        let (api, _cache, gateway) = setup();
        let trade = open_trade("t1", "USDJPY", TradeSide::Buy, 0.1, 150.0);

        let result = gateway.close_trade(&trade).await;
        assert!(matches!(result, Err(OrderError::NoPriceData(ref s)) if s == "USDJPY"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_modify_attaches_prices() {
        let (api, _cache, gateway) = setup();
        let trade = open_trade("t1", "GBPUSD", TradeSide::Sell, 0.1, 1.28);

        gateway
            .modify_sl_tp(&regular_account("acc-1", 1000.0), &trade, Some(1.29), None)
            .await
            .unwrap();

        let modified = api.modified.lock().unwrap();
        assert_eq!(modified[0].sl, Some(1.29));
        assert_eq!(modified[0].tp, None);
        assert_eq!(modified[0].bid, 1.27);
    }

    #[tokio::test]
    async fn test_modify_cannot_remove_mandatory_stop_loss() {
        let (api, _cache, gateway) = setup();
        let trade = open_trade("t1", "EURUSD", TradeSide::Buy, 0.1, 1.09);

        let result = gateway
            .modify_sl_tp(&challenge_account("ch-1", true), &trade, None, Some(1.2))
            .await;
        assert!(matches!(
            result,
            Err(OrderError::Validation(ValidationError::StopLossRequired))
        ));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_pending() {
        let (api, _cache, gateway) = setup();
        gateway.cancel_pending_order("p1").await.unwrap();
        assert_eq!(api.calls(), vec!["cancel:p1".to_string()]);
    }
}

// =============================================================================
// Batch operations
// =============================================================================

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_close_all_continues_past_failure() {
        let (api, _cache, gateway) = setup();
        api.fail_close.lock().unwrap().insert("t2".to_string());
        let trades = vec![
            open_trade("t1", "EURUSD", TradeSide::Buy, 0.1, 1.09),
            open_trade("t2", "EURUSD", TradeSide::Buy, 0.1, 1.09),
            open_trade("t3", "GBPUSD", TradeSide::Sell, 0.1, 1.28),
        ];

        let outcome = gateway.close_all(&trades, CloseAllFilter::All).await.unwrap();
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.message(), "Closed 2 trade(s)");
        assert_eq!(
            api.calls(),
            vec!["close:t1".to_string(), "close:t2".to_string(), "close:t3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_close_profitable_only() {
        let (api, _cache, gateway) = setup();
        let trades = vec![
            // BUY below bid: winner
            open_trade("win", "EURUSD", TradeSide::Buy, 0.1, 1.09),
            // BUY above bid: loser
            open_trade("lose", "EURUSD", TradeSide::Buy, 0.1, 1.11),
        ];

        let outcome = gateway
            .close_all(&trades, CloseAllFilter::Profitable)
            .await
            .unwrap();
        assert_eq!(outcome.attempted, 1);
        assert_eq!(api.calls(), vec!["close:win".to_string()]);

        api.clear_calls();
        gateway.close_all(&trades, CloseAllFilter::Losing).await.unwrap();
        assert_eq!(api.calls(), vec!["close:lose".to_string()]);
    }

    #[tokio::test]
    async fn test_kill_switch_closes_and_cancels() {
        let (api, _cache, gateway) = setup();
        let open = vec![open_trade("t1", "EURUSD", TradeSide::Buy, 0.1, 1.09)];
        let pending = vec![pending_order("p1", "GBPUSD", PendingOrderType::BuyLimit, 1.25)];

        let outcome = gateway.kill_switch(&open, &pending).await.unwrap();
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(
            api.calls(),
            vec!["close:t1".to_string(), "cancel:p1".to_string()]
        );
    }
}
