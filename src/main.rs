use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tradesync::services::{InstrumentCatalog, PriceCache, SelectionStore, TradingSynchronizer};
use tradesync::sources::{HttpTradingApi, PriceStream, TradingApi};
use tradesync::Config;

const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradesync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let user_id = config
        .user_id
        .clone()
        .ok_or_else(|| anyhow::anyhow!("USER_ID must be set"))?;
    info!("Starting tradesync for user {} against {}", user_id, config.api_base_url);

    let api: Arc<dyn TradingApi> = Arc::new(HttpTradingApi::new(
        &config.api_base_url,
        config.auth_token.clone(),
        config.request_timeout,
    )?);
    let prices = PriceCache::new();
    let store = Arc::new(SelectionStore::new(&config.store_path)?);

    // Price stream
    let stream = PriceStream::new(config.stream.clone(), prices.clone());
    stream.connect();

    // Instrument catalog
    let catalog = InstrumentCatalog::new(api.clone());
    if let Err(e) = catalog.load().await {
        warn!("Instrument catalog unavailable: {}", e);
    }

    let sync = TradingSynchronizer::new(&user_id, config.sync.clone(), api, prices, store);

    // Log notifications
    let mut notifications = sync.subscribe_notifications();
    let notification_task = tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(n) => info!("[{}] {}: {}", n.notification_type.as_str(), n.title, n.message),
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} notifications", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    match sync.restore().await {
        Ok(Some(selection)) => info!("Active account: {:?}", selection),
        Ok(None) => warn!("No trading account available"),
        Err(e) => error!("Failed to restore account selection: {}", e),
    }

    // Periodic metrics line
    let metrics_sync = sync.clone();
    let metrics_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(METRICS_LOG_INTERVAL);
        loop {
            interval.tick().await;
            if let Some(m) = metrics_sync.metrics().map(|m| m.rounded()) {
                info!(
                    "equity={:.2} floating={:.2} free_margin={:.2} today={:.2} open={} prices={}",
                    m.equity,
                    m.total_floating_pnl,
                    m.free_margin,
                    m.today_pnl,
                    metrics_sync.open_trades().len(),
                    metrics_sync.prices().len()
                );
                if let Some(c) = m.challenge {
                    info!(
                        "challenge daily_dd={:.2}% overall_dd={:.2}% profit={:.2}%",
                        c.daily_drawdown_pct, c.overall_drawdown_pct, c.profit_pct
                    );
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    metrics_task.abort();
    sync.stop();
    stream.disconnect().await;
    notification_task.abort();

    Ok(())
}
