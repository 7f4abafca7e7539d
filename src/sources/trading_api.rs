//! Trading backend REST client.
//!
//! Paths and bodies match the backend contract exactly. Read endpoints turn
//! `success: false`, non-JSON bodies and transport failures into
//! [`AppError`]s; write endpoints hand the parsed body back so the caller
//! can classify business rejections.

use crate::error::{AppError, Result};
use crate::types::{
    ApiAck, CancelOrderRequest, ChallengeAccountDto, ChallengeAccountsResponse, CloseTradeRequest,
    CloseTradeResponse, Instrument, InstrumentsResponse, ModifyTradeRequest, OpenTradeRequest,
    OpenTradeResponse, PriceMap, RegularAccountDto, RegularAccountsResponse, SlTpCheckRequest,
    SlTpCheckResponse, AccountSummary, SummaryResponse, Trade, TradesResponse,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Everything the synchronizer needs from the backend.
#[async_trait]
pub trait TradingApi: Send + Sync {
    async fn fetch_trading_accounts(&self, user_id: &str) -> Result<Vec<RegularAccountDto>>;

    async fn fetch_challenge_accounts(&self, user_id: &str) -> Result<Vec<ChallengeAccountDto>>;

    async fn fetch_open_trades(&self, account_id: &str) -> Result<Vec<Trade>>;

    async fn fetch_pending_orders(&self, account_id: &str) -> Result<Vec<Trade>>;

    async fn fetch_trade_history(&self, account_id: &str, limit: u32) -> Result<Vec<Trade>>;

    async fn fetch_account_summary(&self, account_id: &str, prices: &PriceMap) -> Result<AccountSummary>;

    async fn fetch_instruments(&self) -> Result<Vec<Instrument>>;

    /// `idempotency_key` is sent as the `Idempotency-Key` header.
    async fn open_trade(&self, request: &OpenTradeRequest, idempotency_key: &str) -> Result<OpenTradeResponse>;

    async fn close_trade(&self, request: &CloseTradeRequest) -> Result<CloseTradeResponse>;

    async fn modify_trade(&self, request: &ModifyTradeRequest) -> Result<ApiAck>;

    async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<ApiAck>;

    async fn check_sltp(&self, request: &SlTpCheckRequest) -> Result<SlTpCheckResponse>;
}

/// `reqwest`-backed implementation of [`TradingApi`].
#[derive(Clone)]
pub struct HttpTradingApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTradingApi {
    /// Create a new client against `base_url` (e.g. `http://host:5000/api`).
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and parse a JSON body.
    ///
    /// Business rejections come back as 4xx with a JSON body, so the status
    /// code only matters when the body is not JSON.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        let body = response.text().await?;

        if !is_json {
            if !status.is_success() {
                return Err(AppError::Http {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                });
            }
            return Err(AppError::Decode(format!(
                "expected JSON, got {} bytes of something else",
                body.len()
            )));
        }

        serde_json::from_str(&body).map_err(|e| AppError::Decode(e.to_string()))
    }

    async fn get_trades(&self, path: String) -> Result<Vec<Trade>> {
        let response: TradesResponse = self.send(self.client.get(self.url(&path))).await?;
        if !response.success {
            return Err(AppError::Api(
                response.message.unwrap_or_else(|| format!("{} failed", path)),
            ));
        }
        Ok(response.trades)
    }
}

#[async_trait]
impl TradingApi for HttpTradingApi {
    async fn fetch_trading_accounts(&self, user_id: &str) -> Result<Vec<RegularAccountDto>> {
        let path = format!("/trading-accounts/user/{}", user_id);
        let response: RegularAccountsResponse = self.send(self.client.get(self.url(&path))).await?;
        Ok(response.accounts)
    }

    async fn fetch_challenge_accounts(&self, user_id: &str) -> Result<Vec<ChallengeAccountDto>> {
        let path = format!("/prop/my-accounts/{}", user_id);
        let response: ChallengeAccountsResponse = self.send(self.client.get(self.url(&path))).await?;
        if !response.success {
            return Err(AppError::Api(
                response
                    .message
                    .unwrap_or_else(|| "Failed to load challenge accounts".to_string()),
            ));
        }
        Ok(response.accounts)
    }

    async fn fetch_open_trades(&self, account_id: &str) -> Result<Vec<Trade>> {
        self.get_trades(format!("/trade/open/{}", account_id)).await
    }

    async fn fetch_pending_orders(&self, account_id: &str) -> Result<Vec<Trade>> {
        self.get_trades(format!("/trade/pending/{}", account_id)).await
    }

    async fn fetch_trade_history(&self, account_id: &str, limit: u32) -> Result<Vec<Trade>> {
        self.get_trades(format!("/trade/history/{}?limit={}", account_id, limit))
            .await
    }

    async fn fetch_account_summary(&self, account_id: &str, prices: &PriceMap) -> Result<AccountSummary> {
        let path = format!("/trade/summary/{}", account_id);
        let prices_json = serde_json::to_string(prices)?;
        let builder = self
            .client
            .get(self.url(&path))
            .query(&[("prices", prices_json.as_str())]);

        let response: SummaryResponse = self.send(builder).await?;
        match (response.success, response.summary) {
            (true, Some(summary)) => Ok(summary),
            _ => Err(AppError::Api(
                response
                    .message
                    .unwrap_or_else(|| "Summary unavailable".to_string()),
            )),
        }
    }

    async fn fetch_instruments(&self) -> Result<Vec<Instrument>> {
        let response: InstrumentsResponse =
            self.send(self.client.get(self.url("/prices/instruments"))).await?;
        if !response.success {
            return Err(AppError::Api("Failed to load instruments".to_string()));
        }
        Ok(response.instruments)
    }

    async fn open_trade(&self, request: &OpenTradeRequest, idempotency_key: &str) -> Result<OpenTradeResponse> {
        debug!(
            "POST /trade/open {} {} {} x{}",
            request.symbol, request.side, request.order_type, request.quantity
        );
        let builder = self
            .client
            .post(self.url("/trade/open"))
            .header("Idempotency-Key", idempotency_key)
            .json(request);
        self.send(builder).await
    }

    async fn close_trade(&self, request: &CloseTradeRequest) -> Result<CloseTradeResponse> {
        debug!("POST /trade/close {}", request.trade_id);
        self.send(self.client.post(self.url("/trade/close")).json(request))
            .await
    }

    async fn modify_trade(&self, request: &ModifyTradeRequest) -> Result<ApiAck> {
        debug!("PUT /trade/modify {}", request.trade_id);
        self.send(self.client.put(self.url("/trade/modify")).json(request))
            .await
    }

    async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<ApiAck> {
        debug!("POST /trade/cancel {}", request.trade_id);
        self.send(self.client.post(self.url("/trade/cancel")).json(request))
            .await
    }

    async fn check_sltp(&self, request: &SlTpCheckRequest) -> Result<SlTpCheckResponse> {
        self.send(self.client.post(self.url("/trade/check-sltp")).json(request))
            .await
    }
}
