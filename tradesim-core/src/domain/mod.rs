//! Domain types for the trading simulation

pub mod position;
pub mod series;
pub mod trade;

pub use position::Position;
pub use series::{Candles, PriceSeries, CLOSE_COLUMN};
pub use trade::{Side, TradeRecord};
