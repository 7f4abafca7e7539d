//! Instrument catalog with client-local watchlist.

use crate::error::Result;
use crate::services::price_cache::PriceCache;
use crate::sources::trading_api::TradingApi;
use crate::types::{Instrument, InstrumentCategory, InstrumentView};
use dashmap::DashSet;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Tradable instruments, loaded once per session.
pub struct InstrumentCatalog {
    api: Arc<dyn TradingApi>,
    instruments: RwLock<Option<Vec<Instrument>>>,
    starred: DashSet<String>,
}

impl InstrumentCatalog {
    pub fn new(api: Arc<dyn TradingApi>) -> Self {
        Self {
            api,
            instruments: RwLock::new(None),
            starred: DashSet::new(),
        }
    }

    /// Fetch the catalog unless it is already loaded. Returns the count.
    pub async fn load(&self) -> Result<usize> {
        if let Some(list) = self.instruments.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(list.len());
        }

        let list = self.api.fetch_instruments().await?;
        let count = list.len();
        info!("Loaded {} instruments", count);
        *self.instruments.write().unwrap_or_else(|e| e.into_inner()) = Some(list);
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.instruments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn all(&self) -> Vec<Instrument> {
        self.instruments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_default()
    }

    pub fn find(&self, symbol: &str) -> Option<Instrument> {
        self.all().into_iter().find(|i| i.symbol == symbol)
    }

    pub fn by_category(&self, category: InstrumentCategory) -> Vec<Instrument> {
        self.all()
            .into_iter()
            .filter(|i| i.category == category)
            .collect()
    }

    /// Flip the starred flag. Returns the new state.
    pub fn toggle_star(&self, symbol: &str) -> bool {
        if self.starred.remove(symbol).is_some() {
            false
        } else {
            self.starred.insert(symbol.to_string());
            true
        }
    }

    pub fn is_starred(&self, symbol: &str) -> bool {
        self.starred.contains(symbol)
    }

    /// Starred instruments in catalog order.
    pub fn watchlist(&self) -> Vec<Instrument> {
        self.all()
            .into_iter()
            .filter(|i| self.starred.contains(&i.symbol))
            .collect()
    }

    /// Every instrument joined with its starred flag and latest quote.
    pub fn views(&self, prices: &PriceCache) -> Vec<InstrumentView> {
        self.all()
            .into_iter()
            .map(|i| InstrumentView {
                starred: self.starred.contains(&i.symbol),
                quote: prices.get(&i.symbol),
                symbol: i.symbol,
                name: i.name,
                category: i.category,
            })
            .collect()
    }
}
