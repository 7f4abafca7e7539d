use std::env;
use std::time::Duration;

/// Polling schedule for the trading synchronizer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Open trades, pending orders and account summary.
    pub trades_interval: Duration,
    /// Challenge drawdown baselines.
    pub challenge_interval: Duration,
    /// Closed trade history.
    pub history_interval: Duration,
    /// Account list balances.
    pub accounts_interval: Duration,
    /// Server-side SL/TP evaluation.
    pub sltp_interval: Duration,
    /// Number of closed trades requested per history poll.
    pub history_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            trades_interval: Duration::from_millis(2_000),
            challenge_interval: Duration::from_millis(5_000),
            history_interval: Duration::from_millis(10_000),
            accounts_interval: Duration::from_millis(30_000),
            sltp_interval: Duration::from_millis(2_000),
            history_limit: 50,
        }
    }
}

/// Price stream connection settings.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Socket.IO websocket endpoint.
    pub ws_url: String,
    /// Reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// REST API root, without trailing slash.
    pub api_base_url: String,
    /// Owner of the trading and challenge accounts.
    pub user_id: Option<String>,
    /// Bearer token attached to REST calls.
    pub auth_token: Option<String>,
    /// SQLite file holding the active account selection.
    pub store_path: String,
    /// REST request timeout.
    pub request_timeout: Duration,
    /// Price stream settings.
    pub stream: StreamConfig,
    /// Polling schedule.
    pub sync: SyncConfig,
}

fn env_millis(key: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

/// Derive the Socket.IO websocket URL from the REST root.
///
/// `http://host:5000/api` becomes `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
pub fn derive_ws_url(api_base_url: &str) -> String {
    let (scheme, rest) = if let Some(rest) = api_base_url.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = api_base_url.strip_prefix("http://") {
        ("ws", rest)
    } else {
        ("ws", api_base_url)
    };
    let host = rest.split('/').next().unwrap_or(rest);
    format!("{}://{}/socket.io/?EIO=4&transport=websocket", scheme, host)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:5000/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let ws_url = env::var("PRICE_WS_URL").unwrap_or_else(|_| derive_ws_url(&api_base_url));

        let defaults = SyncConfig::default();

        Self {
            user_id: env::var("USER_ID").ok().filter(|v| !v.is_empty()),
            auth_token: env::var("AUTH_TOKEN").ok().filter(|v| !v.is_empty()),
            store_path: env::var("STORE_PATH").unwrap_or_else(|_| "tradesync.db".to_string()),
            request_timeout: env_millis("REQUEST_TIMEOUT_MS", 10_000),
            stream: StreamConfig {
                ws_url,
                max_reconnect_attempts: env::var("WS_MAX_RECONNECTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            },
            sync: SyncConfig {
                trades_interval: env_millis("TRADES_POLL_MS", 2_000),
                challenge_interval: env_millis("CHALLENGE_POLL_MS", 5_000),
                history_interval: env_millis("HISTORY_POLL_MS", 10_000),
                accounts_interval: env_millis("ACCOUNTS_POLL_MS", 30_000),
                sltp_interval: env_millis("SLTP_CHECK_MS", 2_000),
                history_limit: env::var("HISTORY_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.history_limit),
            },
            api_base_url,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
