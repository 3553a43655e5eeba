//! Tradesim Core — the accounting engine of a step-driven trading simulation.
//!
//! This crate contains:
//! - `PriceSeries`, the timestamp-indexed table the simulation steps through
//! - `Position`, the zero-or-one open holding (flat, long or short)
//! - `Broker`, which owns cash, the position, the price cursor and the
//!   closed-trade ledger, and derives equity/free assets/account state
//!
//! Everything here is single-threaded and synchronous. Parallel rollouts get
//! their own `Broker` replica each; nothing is shared between them.

pub mod broker;
pub mod domain;
pub mod error;

pub use broker::{fee_adjusted, AccountState, Broker, OrderOutcome};
pub use domain::{Candles, Position, PriceSeries, Side, TradeRecord};
pub use error::{BrokerError, SeriesError};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: replicas can be moved into worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Broker>();
        require_sync::<Broker>();
        require_send::<Position>();
        require_sync::<Position>();
        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<TradeRecord>();
        require_sync::<TradeRecord>();
        require_send::<AccountState>();
        require_sync::<AccountState>();
        require_send::<BrokerError>();
        require_sync::<BrokerError>();
    }
}
