use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Bounded trailing window of closed candles for one series.
///
/// Retains just enough history to answer the lookback extrema queries;
/// the ATR is carried incrementally and does not read back into this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleWindow {
    capacity: usize,
    candles: VecDeque<Candle>,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        CandleWindow {
            capacity: capacity.max(1),
            candles: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        while self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Highest high over the most recent `lookback` candles (current
    /// included). None while fewer than `lookback` candles are retained.
    pub fn highest_high(&self, lookback: usize) -> Option<f64> {
        self.recent(lookback)?
            .map(|c| c.high)
            .fold(None, |acc: Option<f64>, h| Some(acc.map_or(h, |a| a.max(h))))
    }

    pub fn lowest_low(&self, lookback: usize) -> Option<f64> {
        self.recent(lookback)?
            .map(|c| c.low)
            .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.min(l))))
    }

    fn recent(&self, lookback: usize) -> Option<impl Iterator<Item = &Candle>> {
        if lookback == 0 || self.candles.len() < lookback {
            return None;
        }
        Some(self.candles.iter().skip(self.candles.len() - lookback))
    }
}
