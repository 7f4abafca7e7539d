pub mod price_stream;
pub mod socketio;
pub mod trading_api;

pub use price_stream::{PriceStream, ReconnectBackoff};
pub use trading_api::{HttpTradingApi, TradingApi};
