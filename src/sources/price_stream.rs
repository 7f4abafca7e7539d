//! Socket.IO price stream client.
//!
//! Keeps one shared connection to the backend's price channel and merges
//! every inbound message into the [`PriceCache`]. Reconnects automatically
//! with a short linear backoff and gives up after a fixed number of
//! consecutive failures.

use crate::config::StreamConfig;
use crate::error::{AppError, Result};
use crate::services::price_cache::{PriceCache, PriceSubscription};
use crate::sources::socketio::{self, Packet};
use crate::types::{PriceMap, PriceSnapshot, PriceUpdate};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub const SUBSCRIBE_EVENT: &str = "subscribePrices";
pub const UNSUBSCRIBE_EVENT: &str = "unsubscribePrices";
pub const SNAPSHOT_EVENT: &str = "priceStream";
pub const UPDATE_EVENT: &str = "priceUpdate";

/// Delay before reconnect attempt `attempt` (1-based): 1s, 2s, ... capped at 5s.
pub fn reconnect_delay(attempt: u32) -> Duration {
    Duration::from_secs(u64::from(attempt.clamp(1, 5)))
}

/// Reconnect budget for one stream. The initial connect is free; each
/// reconnect after a drop or failure spends one attempt, and a successful
/// subscribe restores the full budget.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    max: u32,
    attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(max: u32) -> Self {
        Self { max, attempts: 0 }
    }

    /// Spend one attempt and return the wait before it, or `None` once
    /// `max` reconnects have been made.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max {
            return None;
        }
        self.attempts += 1;
        Some(reconnect_delay(self.attempts))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Reconnects made since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Shared price stream connection.
pub struct PriceStream {
    config: StreamConfig,
    cache: Arc<PriceCache>,
    connected: AtomicBool,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PriceStream {
    /// Create a new stream client writing into `cache`.
    pub fn new(config: StreamConfig, cache: Arc<PriceCache>) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            config,
            cache,
            connected: AtomicBool::new(false),
            running: AtomicBool::new(false),
            shutdown,
            task: Mutex::new(None),
        })
    }

    /// The cache this stream writes into.
    pub fn cache(&self) -> Arc<PriceCache> {
        self.cache.clone()
    }

    /// Whether the socket is currently up and subscribed.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Register a price listener. See [`PriceCache::add_listener`].
    pub fn add_price_listener<F>(&self, listener: F) -> PriceSubscription
    where
        F: Fn(&PriceMap) + Send + Sync + 'static,
    {
        self.cache.add_listener(listener)
    }

    /// Start the connection loop. Calling again while running is a no-op.
    pub fn connect(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("Price stream already running");
            return;
        }
        self.shutdown.send_replace(false);

        let stream = self.clone();
        let handle = tokio::spawn(async move {
            stream.run().await;
        });
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Unsubscribe and stop the connection loop.
    pub async fn disconnect(&self) {
        self.shutdown.send_replace(true);
        let handle = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            // The loop exits on its own after sending the unsubscribe frame.
            if tokio::time::timeout(Duration::from_secs(2), handle).await.is_err() {
                warn!("Price stream did not stop in time");
            }
        }
        self.connected.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut backoff = ReconnectBackoff::new(self.config.max_reconnect_attempts);

        loop {
            let result = self.run_connection(&mut shutdown, &mut backoff).await;
            self.connected.store(false, Ordering::Release);

            if *shutdown.borrow() {
                info!("Price stream stopped");
                break;
            }

            match result {
                Ok(()) => warn!("Price stream disconnected, reconnecting..."),
                Err(e) => error!("Price stream error: {}, reconnecting...", e),
            }

            let Some(delay) = backoff.next_delay() else {
                error!(
                    "Price stream gave up after {} reconnect attempts",
                    backoff.attempts()
                );
                break;
            };
            debug!("Reconnect attempt {} in {:?}", backoff.attempts(), delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    info!("Price stream stopped while waiting to reconnect");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::Release);
    }

    async fn run_connection(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ReconnectBackoff,
    ) -> Result<()> {
        info!("Connecting to price stream at {}", self.config.ws_url);
        let (ws_stream, _) = connect_async(self.config.ws_url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let was_connected = self.is_connected();
                            for frame in self.handle_frame(&text)? {
                                write.send(Message::Text(frame)).await?;
                            }
                            if !was_connected && self.is_connected() {
                                backoff.reset();
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("Price stream closed by server");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => return Ok(()),
                        _ => {}
                    }
                }
                _ = shutdown.changed() => {
                    if self.is_connected() {
                        let frame = socketio::encode_event(UNSUBSCRIBE_EVENT, None);
                        let _ = write.send(Message::Text(frame)).await;
                    }
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    /// Process one text frame and return the frames to send back.
    pub fn handle_frame(&self, text: &str) -> Result<Vec<String>> {
        match socketio::decode(text) {
            Packet::Open(handshake) => {
                debug!(
                    "Price stream handshake sid={} ping={}ms",
                    handshake.sid, handshake.ping_interval
                );
                Ok(vec![socketio::CONNECT.to_string()])
            }
            Packet::Connected => {
                self.connected.store(true, Ordering::Release);
                info!("Price stream connected, subscribing");
                Ok(vec![socketio::encode_event(SUBSCRIBE_EVENT, None)])
            }
            Packet::Ping => Ok(vec![socketio::PONG.to_string()]),
            Packet::Pong => Ok(Vec::new()),
            Packet::Event { name, data } => {
                self.handle_event(&name, data);
                Ok(Vec::new())
            }
            Packet::Disconnected | Packet::Close => {
                Err(AppError::WebSocket("server closed the price channel".to_string()))
            }
            Packet::ConnectError(reason) => Err(AppError::WebSocket(format!(
                "namespace connect refused: {}",
                reason
            ))),
            Packet::Unknown(frame) => {
                debug!("Ignoring unknown frame: {}", frame);
                Ok(Vec::new())
            }
        }
    }

    fn handle_event(&self, name: &str, data: Value) {
        match name {
            SNAPSHOT_EVENT => match serde_json::from_value::<PriceSnapshot>(data) {
                Ok(snapshot) => self.cache.merge_snapshot(snapshot.into_prices()),
                Err(e) => warn!("Bad priceStream payload: {}", e),
            },
            UPDATE_EVENT => match serde_json::from_value::<PriceUpdate>(data) {
                Ok(update) => self.cache.merge_update(&update.symbol, update.quote()),
                Err(e) => warn!("Bad priceUpdate payload: {}", e),
            },
            other => debug!("Ignoring event {}", other),
        }
    }
}
