pub mod account;
pub mod instrument;
pub mod metrics;
pub mod notification;
pub mod order;
pub mod price;
pub mod trade;

pub use account::*;
pub use instrument::*;
pub use metrics::*;
pub use notification::*;
pub use order::*;
pub use price::*;
pub use trade::*;
