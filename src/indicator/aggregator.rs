use serde::{Deserialize, Serialize};

use crate::config::GapPolicy;
use crate::domain::Candle;

/// Folds raw price samples or pre-bucketed klines into an ordered stream
/// of closed candles for one (symbol, interval).
///
/// Late or duplicate input for an already-closed bucket is discarded;
/// emitted candles are never mutated. Buckets the feed skipped entirely
/// are handled per the configured gap policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleAggregator {
    interval_ms: i64,
    gap_policy: GapPolicy,
    /// Forming candle, tick path only.
    forming: Option<Candle>,
    last_closed_open_time: Option<i64>,
    last_close: Option<f64>,
}

impl CandleAggregator {
    pub fn new(interval_ms: i64, gap_policy: GapPolicy) -> Self {
        CandleAggregator {
            interval_ms,
            gap_policy,
            forming: None,
            last_closed_open_time: None,
            last_close: None,
        }
    }

    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }

    /// Open time and close of the most recently closed candle.
    pub fn last_closed(&self) -> Option<(i64, f64)> {
        match (self.last_closed_open_time, self.last_close) {
            (Some(t), Some(c)) => Some((t, c)),
            _ => None,
        }
    }

    fn bucket_start(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms - timestamp_ms.rem_euclid(self.interval_ms)
    }

    fn bucket_close_time(&self, open_time_ms: i64) -> i64 {
        open_time_ms + self.interval_ms - 1
    }

    /// Fold one raw price sample. Returns the candles this sample closed
    /// (usually none, one at a bucket boundary, more after a gap).
    pub fn push_sample(&mut self, price: f64, timestamp_ms: i64) -> Vec<Candle> {
        let bucket = self.bucket_start(timestamp_ms);
        let mut out = Vec::new();

        if let Some(t) = self.last_closed_open_time {
            if bucket <= t {
                log::warn!(
                    "Discarding sample at {} for already-closed bucket {} (interval {}ms)",
                    timestamp_ms,
                    bucket,
                    self.interval_ms
                );
                return out;
            }
        }

        if let Some(f) = self.forming.as_mut() {
            if bucket == f.open_time_ms {
                f.close = price;
                f.high = f.high.max(price);
                f.low = f.low.min(price);
                return out;
            }
            if bucket < f.open_time_ms {
                log::warn!(
                    "Discarding out-of-order sample at {} (forming bucket {})",
                    timestamp_ms,
                    f.open_time_ms
                );
                return out;
            }
        }

        // Boundary crossed (or very first sample): freeze any forming
        // candle, then start a new one from the crossing sample.
        if let Some(frozen) = self.forming.take() {
            self.record_closed(frozen, &mut out);
        }
        self.fill_gap_to(bucket, &mut out);
        self.forming = Some(self.seed(bucket, price));
        out
    }

    /// Accept a pre-bucketed closed candle from the feed. Duplicates and
    /// out-of-order buckets are discarded; gaps are filled per policy.
    pub fn push_closed(&mut self, candle: Candle) -> Vec<Candle> {
        let mut out = Vec::new();

        if let Some(t) = self.last_closed_open_time {
            if candle.open_time_ms <= t {
                log::debug!(
                    "Discarding duplicate/out-of-order candle for bucket {} (last closed {})",
                    candle.open_time_ms,
                    t
                );
                return out;
            }
        }

        // A closed kline for this bucket supersedes any tick-built partial.
        if let Some(f) = &self.forming {
            if f.open_time_ms <= candle.open_time_ms {
                self.forming = None;
            }
        }

        self.fill_gap_to(candle.open_time_ms, &mut out);
        self.record_closed(candle, &mut out);
        out
    }

    /// Emit synthetic flat candles for every whole bucket between the
    /// last closed candle and `next_open` (exclusive), FlatFill only.
    fn fill_gap_to(&mut self, next_open: i64, out: &mut Vec<Candle>) {
        let (Some(last_open), Some(last_close)) = (self.last_closed_open_time, self.last_close) else {
            return;
        };
        let expected = last_open + self.interval_ms;
        if next_open <= expected {
            return;
        }
        let missing = (next_open - expected) / self.interval_ms;
        match self.gap_policy {
            GapPolicy::Skip => {
                log::warn!(
                    "Feed gap of {} bucket(s) before {}; skipping per policy",
                    missing,
                    next_open
                );
            }
            GapPolicy::FlatFill => {
                log::warn!(
                    "Feed gap of {} bucket(s) before {}; inserting flat candles",
                    missing,
                    next_open
                );
                let mut open = expected;
                while open < next_open {
                    let flat = Candle::flat(open, self.bucket_close_time(open), last_close);
                    self.record_closed(flat, out);
                    open += self.interval_ms;
                }
            }
        }
    }

    fn record_closed(&mut self, candle: Candle, out: &mut Vec<Candle>) {
        self.last_closed_open_time = Some(candle.open_time_ms);
        self.last_close = Some(candle.close);
        out.push(candle);
    }

    fn seed(&self, open_time_ms: i64, price: f64) -> Candle {
        Candle::new(
            open_time_ms,
            self.bucket_close_time(open_time_ms),
            price,
            price,
            price,
            price,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60_000;

    fn agg() -> CandleAggregator {
        CandleAggregator::new(MIN, GapPolicy::FlatFill)
    }

    fn closed(minute: i64, close: f64) -> Candle {
        Candle::new(minute * MIN, (minute + 1) * MIN - 1, close, close + 1.0, close - 1.0, close)
    }

    #[test]
    fn ticks_fold_into_ohlc() {
        let mut a = agg();
        assert!(a.push_sample(100.0, 0).is_empty());
        assert!(a.push_sample(105.0, 10_000).is_empty());
        assert!(a.push_sample(95.0, 20_000).is_empty());
        assert!(a.push_sample(101.0, 30_000).is_empty());

        // First sample of the next bucket closes the candle
        let out = a.push_sample(102.0, MIN + 5);
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!((c.open, c.high, c.low, c.close), (100.0, 105.0, 95.0, 101.0));
        assert_eq!(c.open_time_ms, 0);
        assert_eq!(c.close_time_ms, MIN - 1);
    }

    #[test]
    fn late_sample_for_closed_bucket_is_discarded() {
        let mut a = agg();
        a.push_sample(100.0, 0);
        let out = a.push_sample(101.0, MIN);
        assert_eq!(out.len(), 1);
        // Sample back inside the closed bucket: no retroactive mutation
        assert!(a.push_sample(999.0, 30_000).is_empty());
        assert_eq!(a.last_closed(), Some((0, 100.0)));
    }

    #[test]
    fn tick_gap_emits_flat_candles() {
        let mut a = agg();
        a.push_sample(100.0, 0);
        a.push_sample(110.0, MIN); // closes bucket 0
        // Next sample lands in bucket 4: buckets 1-3 were skipped
        // (bucket 1 closes as the real forming candle, 2 and 3 are flat)
        let out = a.push_sample(120.0, 4 * MIN);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].close, 110.0);
        assert!(out[1] == Candle::flat(2 * MIN, 3 * MIN - 1, 110.0));
        assert!(out[2] == Candle::flat(3 * MIN, 4 * MIN - 1, 110.0));
    }

    #[test]
    fn closed_kline_duplicates_are_idempotent() {
        let mut a = agg();
        assert_eq!(a.push_closed(closed(0, 100.0)).len(), 1);
        assert!(a.push_closed(closed(0, 100.0)).is_empty());
        assert!(a.push_closed(closed(0, 999.0)).is_empty());
        assert_eq!(a.last_closed(), Some((0, 100.0)));
    }

    #[test]
    fn out_of_order_closed_kline_is_discarded() {
        let mut a = agg();
        a.push_closed(closed(5, 100.0));
        assert!(a.push_closed(closed(3, 90.0)).is_empty());
    }

    #[test]
    fn closed_kline_gap_fills_flat() {
        // Feed reports minutes 1,2,3,7,8: minutes 4,5,6 become flat
        let mut a = agg();
        let mut emitted = Vec::new();
        for m in [1, 2, 3] {
            emitted.extend(a.push_closed(closed(m, 100.0 + m as f64)));
        }
        emitted.extend(a.push_closed(closed(7, 110.0)));
        emitted.extend(a.push_closed(closed(8, 111.0)));

        assert_eq!(emitted.len(), 8);
        for (i, m) in [4, 5, 6].iter().enumerate() {
            let c = &emitted[3 + i];
            assert_eq!(c.open_time_ms, m * MIN);
            // Flat at the last known close (minute 3 closed at 103)
            assert_eq!((c.open, c.high, c.low, c.close), (103.0, 103.0, 103.0, 103.0));
        }
    }

    #[test]
    fn skip_policy_emits_no_synthetic_candles() {
        let mut a = CandleAggregator::new(MIN, GapPolicy::Skip);
        a.push_closed(closed(1, 100.0));
        let out = a.push_closed(closed(5, 104.0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].open_time_ms, 5 * MIN);
    }

    #[test]
    fn closed_kline_supersedes_forming_tick_candle() {
        let mut a = agg();
        a.push_sample(100.0, 0);
        let out = a.push_closed(closed(0, 101.0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].close, 101.0);
        // The partial tick candle is gone; next tick starts bucket 1 cleanly
        assert!(a.push_sample(102.0, MIN + 1).is_empty());
    }
}
