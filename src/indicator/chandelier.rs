use serde::{Deserialize, Serialize};

/// The two stop lines as of the most recently processed candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLines {
    pub long_stop: f64,
    pub short_stop: f64,
}

/// Chandelier Exit stop calculator with the ratchet rule.
///
/// While the prior close holds beyond a stop line, that line only moves
/// in the trend's favor (long stop never down, short stop never up).
/// Once the prior close has crossed the line, the stop snaps back to the
/// fresh extremum-derived candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChandelierStop {
    multiplier: f64,
    stops: Option<StopLines>,
    prev_close: Option<f64>,
}

impl ChandelierStop {
    pub fn new(multiplier: f64) -> Self {
        ChandelierStop {
            multiplier,
            stops: None,
            prev_close: None,
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Advance the stop lines with candle i's close, lookback extrema and
    /// ATR. Returns the stops as of candle i-1, which is what the trend
    /// rule compares the current close against.
    pub fn advance(&mut self, close: f64, highest_high: f64, lowest_low: f64, atr: f64) -> Option<StopLines> {
        let candidate_long = highest_high - self.multiplier * atr;
        let candidate_short = lowest_low + self.multiplier * atr;

        let prev = self.stops;
        let next = match (prev, self.prev_close) {
            (Some(p), Some(pc)) => StopLines {
                long_stop: if pc > p.long_stop {
                    candidate_long.max(p.long_stop)
                } else {
                    candidate_long
                },
                short_stop: if pc < p.short_stop {
                    candidate_short.min(p.short_stop)
                } else {
                    candidate_short
                },
            },
            // First candle with defined ATR and full lookback
            _ => StopLines {
                long_stop: candidate_long,
                short_stop: candidate_short,
            },
        };

        self.stops = Some(next);
        self.prev_close = Some(close);
        prev
    }

    pub fn current(&self) -> Option<StopLines> {
        self.stops
    }
}
