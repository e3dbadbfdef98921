//! Configuration module for the alert engine.

mod binance;
mod persistence;
mod settings;
mod telegram;

// Re-export commonly used items
pub use binance::{BINANCE, BinanceApiConfig};
pub use persistence::{PERSISTENCE, snapshot_filename};
pub use settings::{GapPolicy, Settings, StreamSpec};
pub use telegram::TELEGRAM;
