pub mod gateway;
pub mod instruments;
pub mod metrics;
pub mod policy;
pub mod price_cache;
pub mod selection;
pub mod synchronizer;
pub mod watchdog;

pub use gateway::{BatchOutcome, CloseAllFilter, OrderError, OrderGateway, OrderOutcome};
pub use instruments::InstrumentCatalog;
pub use metrics::{compute_metrics, trade_pnl, AccountSnapshot, MetricsCalculator};
pub use policy::{OrderPolicy, ValidationError};
pub use price_cache::{PriceCache, PriceSubscription};
pub use selection::SelectionStore;
pub use synchronizer::{SyncMode, SyncState, TradingSynchronizer};
pub use watchdog::WatchdogReport;
