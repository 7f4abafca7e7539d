use super::price::Quote;
use serde::{Deserialize, Serialize};

/// Instrument category as listed by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentCategory {
    Forex,
    Metals,
    Commodities,
    Crypto,
    #[serde(other)]
    Other,
}

impl InstrumentCategory {
    /// Units per lot used for margin previews when the backend has not
    /// told us the contract size of a concrete trade yet.
    pub fn default_contract_size(&self) -> f64 {
        match self {
            InstrumentCategory::Forex => 100_000.0,
            InstrumentCategory::Metals => 100.0,
            InstrumentCategory::Commodities => 1_000.0,
            InstrumentCategory::Crypto => 1.0,
            InstrumentCategory::Other => 1.0,
        }
    }

    /// Segment string sent with orders.
    pub fn segment(&self) -> &'static str {
        match self {
            InstrumentCategory::Forex => "Forex",
            InstrumentCategory::Metals => "Metals",
            InstrumentCategory::Commodities => "Commodities",
            InstrumentCategory::Crypto => "Crypto",
            InstrumentCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for InstrumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segment())
    }
}

/// Catalog entry from `/prices/instruments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub category: InstrumentCategory,
}

/// Instrument joined with client-local state for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentView {
    pub symbol: String,
    pub name: String,
    pub category: InstrumentCategory,
    pub starred: bool,
    pub quote: Option<Quote>,
}

impl InstrumentView {
    pub fn spread(&self) -> Option<f64> {
        self.quote.and_then(|q| q.spread())
    }
}

/// Envelope of `/prices/instruments`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
}
