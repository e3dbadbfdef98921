use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Recursive Heikin Ashi transform.
///
/// HA_open depends on the immediately preceding HA candle, so candles
/// must be fed in strict arrival order, and any reset of the upstream
/// aggregator requires resetting this state from the same point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeikinAshi {
    prev_open: Option<f64>,
    prev_close: Option<f64>,
}

impl HeikinAshi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&mut self, src: &Candle) -> Candle {
        let ha_close = (src.open + src.high + src.low + src.close) / 4.0;
        let ha_open = match (self.prev_open, self.prev_close) {
            (Some(po), Some(pc)) => (po + pc) / 2.0,
            // Seed candle
            _ => (src.open + src.close) / 2.0,
        };
        let ha_high = src.high.max(ha_open).max(ha_close);
        let ha_low = src.low.min(ha_open).min(ha_close);

        self.prev_open = Some(ha_open);
        self.prev_close = Some(ha_close);

        Candle::new(src.open_time_ms, src.close_time_ms, ha_open, ha_high, ha_low, ha_close)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
