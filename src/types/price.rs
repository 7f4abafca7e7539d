use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest bid/ask for one symbol.
///
/// Either side may be missing while the market is closed or before the
/// first tick arrives; consumers treat a missing side as "no price".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
}

impl Quote {
    pub fn new(bid: f64, ask: f64) -> Self {
        Self {
            bid: Some(bid),
            ask: Some(ask),
        }
    }

    /// Both sides present.
    pub fn is_tradable(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }

    /// Ask minus bid, when both sides are known.
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// Symbol to quote map as carried by the price stream and sent back to the
/// backend for summaries and SL/TP checks.
pub type PriceMap = HashMap<String, Quote>;

/// Single-symbol `priceUpdate` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceUpdate {
    pub symbol: String,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
}

impl PriceUpdate {
    pub fn quote(&self) -> Quote {
        Quote {
            bid: self.bid,
            ask: self.ask,
        }
    }
}

/// Bulk `priceStream` payload: either a bare map or wrapped in `prices`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceSnapshot {
    Wrapped { prices: PriceMap },
    Bare(PriceMap),
}

impl PriceSnapshot {
    pub fn into_prices(self) -> PriceMap {
        match self {
            PriceSnapshot::Wrapped { prices } => prices,
            PriceSnapshot::Bare(prices) => prices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_spread() {
        let quote = Quote::new(1.1000, 1.1002);
        assert!((quote.spread().unwrap() - 0.0002).abs() < 1e-12);
        assert!(quote.is_tradable());
    }

    #[test]
    fn test_quote_missing_side() {
        let quote = Quote {
            bid: Some(1.1),
            ask: None,
        };
        assert!(!quote.is_tradable());
        assert!(quote.spread().is_none());
    }

    #[test]
    fn test_quote_null_sides_deserialize() {
        let quote: Quote = serde_json::from_str(r#"{"bid": null, "ask": 1.5}"#).unwrap();
        assert_eq!(quote.bid, None);
        assert_eq!(quote.ask, Some(1.5));
    }

    #[test]
    fn test_snapshot_bare_map() {
        let json = r#"{"EURUSD": {"bid": 1.1, "ask": 1.1002}}"#;
        let prices = serde_json::from_str::<PriceSnapshot>(json)
            .unwrap()
            .into_prices();
        assert_eq!(prices["EURUSD"].bid, Some(1.1));
    }

    #[test]
    fn test_snapshot_wrapped_map() {
        let json = r#"{"prices": {"XAUUSD": {"bid": 2300.5, "ask": 2301.0}}}"#;
        let prices = serde_json::from_str::<PriceSnapshot>(json)
            .unwrap()
            .into_prices();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["XAUUSD"].ask, Some(2301.0));
    }

    #[test]
    fn test_price_update_quote() {
        let update: PriceUpdate =
            serde_json::from_str(r#"{"symbol": "GBPUSD", "bid": 1.27, "ask": 1.2702}"#).unwrap();
        assert_eq!(update.symbol, "GBPUSD");
        assert_eq!(update.quote(), Quote::new(1.27, 1.2702));
    }
}
