use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Average True Range with Wilder smoothing, carried incrementally.
///
/// Undefined until `period` true ranges have been observed; the seed is
/// the simple mean of the first `period` TRs, after which
/// ATR_i = (ATR_{i-1} * (period - 1) + TR_i) / period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtrState {
    period: usize,
    prev_close: Option<f64>,
    seed_sum: f64,
    seed_count: usize,
    atr: Option<f64>,
}

impl AtrState {
    pub fn new(period: usize) -> Self {
        AtrState {
            period: period.max(1),
            prev_close: None,
            seed_sum: 0.0,
            seed_count: 0,
            atr: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Feed one closed candle, in arrival order. Returns the ATR once
    /// seeded, None while warming up.
    pub fn update(&mut self, candle: &Candle) -> Option<f64> {
        let tr = match self.prev_close {
            // First candle: plain range
            None => candle.high - candle.low,
            Some(pc) => (candle.high - candle.low)
                .max((candle.high - pc).abs())
                .max((candle.low - pc).abs()),
        };
        self.prev_close = Some(candle.close);

        match self.atr {
            Some(prev) => {
                let next = (prev * (self.period - 1) as f64 + tr) / self.period as f64;
                self.atr = Some(next);
            }
            None => {
                self.seed_sum += tr;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.atr = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.atr
    }

    pub fn value(&self) -> Option<f64> {
        self.atr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle::new(0, 0, close, high, low, close)
    }

    #[test]
    fn undefined_before_seed() {
        let mut atr = AtrState::new(3);
        assert_eq!(atr.update(&candle(10.0, 8.0, 9.0)), None);
        assert_eq!(atr.update(&candle(11.0, 9.0, 10.0)), None);
        assert!(atr.update(&candle(14.0, 10.0, 13.0)).is_some());
    }

    #[test]
    fn matches_hand_computed_wilder_sequence() {
        // TRs: 2 (h-l), 2 (max of 2, |11-9|, |9-9|), 4 (max of 4, |14-10|, |10-10|)
        // Seed = (2 + 2 + 4) / 3 = 8/3
        // Next TR = max(2, |13-13|, |11-13|) = 2 -> ATR = (8/3 * 2 + 2) / 3 = 22/9
        let mut atr = AtrState::new(3);
        atr.update(&candle(10.0, 8.0, 9.0));
        atr.update(&candle(11.0, 9.0, 10.0));
        let seed = atr.update(&candle(14.0, 10.0, 13.0)).unwrap();
        assert!((seed - 8.0 / 3.0).abs() < TOL);

        let next = atr.update(&candle(13.0, 11.0, 12.0)).unwrap();
        assert!((next - 22.0 / 9.0).abs() < TOL);
    }

    #[test]
    fn gap_above_prior_close_widens_true_range() {
        let mut atr = AtrState::new(2);
        atr.update(&candle(10.0, 9.0, 10.0));
        // Gap up: TR = |15 - 10| = 5, not high - low = 1
        let seeded = atr.update(&candle(15.0, 14.0, 15.0)).unwrap();
        assert!((seeded - (1.0 + 5.0) / 2.0).abs() < TOL);
    }
}
