use crate::types::{PriceMap, Quote};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::debug;

/// Callback invoked with the full merged cache after every update.
pub type PriceListener = Arc<dyn Fn(&PriceMap) + Send + Sync>;

/// Latest bid/ask per symbol.
///
/// The price stream is the only writer. Updates merge at the symbol level:
/// a message carrying a subset of symbols never erases the others.
pub struct PriceCache {
    prices: RwLock<PriceMap>,
    /// Bumped on every merge; used as a memoization key.
    version: AtomicU64,
    listeners: RwLock<Vec<(u64, PriceListener)>>,
    next_listener_id: AtomicU64,
}

/// Keeps a listener registered until dropped or explicitly unsubscribed.
#[must_use = "dropping the subscription unsubscribes the listener"]
pub struct PriceSubscription {
    id: u64,
    cache: Weak<PriceCache>,
}

impl PriceSubscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for PriceSubscription {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            cache.remove_listener(self.id);
        }
    }
}

impl PriceCache {
    /// Create a new, empty price cache.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prices: RwLock::new(PriceMap::new()),
            version: AtomicU64::new(0),
            listeners: RwLock::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        })
    }

    /// Register a listener.
    ///
    /// If prices are already cached the listener is called once, right
    /// away, with the current cache.
    pub fn add_listener<F>(self: &Arc<Self>, listener: F) -> PriceSubscription
    where
        F: Fn(&PriceMap) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let listener: PriceListener = Arc::new(listener);

        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener.clone()));

        let current = self.snapshot();
        if !current.is_empty() {
            listener(&current);
        }

        PriceSubscription {
            id,
            cache: Arc::downgrade(self),
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Merge a bulk snapshot into the cache.
    pub fn merge_snapshot(&self, prices: PriceMap) {
        if prices.is_empty() {
            return;
        }
        {
            let mut cache = self.prices.write().unwrap_or_else(|e| e.into_inner());
            cache.extend(prices);
        }
        self.publish();
    }

    /// Merge a single symbol into the cache.
    pub fn merge_update(&self, symbol: &str, quote: Quote) {
        {
            let mut cache = self.prices.write().unwrap_or_else(|e| e.into_inner());
            cache.insert(symbol.to_string(), quote);
        }
        self.publish();
    }

    fn publish(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);

        let listeners: Vec<PriceListener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        if listeners.is_empty() {
            return;
        }

        // Listeners run without any lock held so they may subscribe or
        // unsubscribe from inside the callback.
        let current = self.snapshot();
        debug!("Publishing {} prices to {} listeners", current.len(), listeners.len());
        for listener in listeners {
            listener(&current);
        }
    }

    /// Current quote for a symbol.
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.prices
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(symbol)
            .copied()
    }

    /// Copy of the whole cache.
    pub fn snapshot(&self) -> PriceMap {
        self.prices.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.prices.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}
