use serde::{Deserialize, Serialize};

/// A closed OHLC candle. Immutable once emitted by the aggregator;
/// stream identity (symbol, interval) lives on the owning series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time_ms: i64,
    pub close_time_ms: i64,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(open_time_ms: i64, close_time_ms: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Candle {
            open_time_ms,
            close_time_ms,
            open,
            high,
            low,
            close,
        }
    }

    /// Synthetic flat candle used by the gap-fill policy: all four prices
    /// pinned to the last known close.
    pub fn flat(open_time_ms: i64, close_time_ms: i64, price: f64) -> Self {
        Candle::new(open_time_ms, close_time_ms, price, price, price, price)
    }
}

/// A kline update as delivered by the exchange stream. Forming candles
/// arrive repeatedly with `is_closed == false`; the final update for a
/// bucket carries `is_closed == true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveKline {
    pub symbol: String,
    pub interval_ms: i64,
    pub open_time_ms: i64,
    pub close_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub is_closed: bool,
}

impl From<&LiveKline> for Candle {
    fn from(k: &LiveKline) -> Self {
        Candle::new(k.open_time_ms, k.close_time_ms, k.open, k.high, k.low, k.close)
    }
}
