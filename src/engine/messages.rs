use crate::domain::{PairInterval, Representation};
use crate::indicator::Direction;

/// A confirmed trend reversal on one candle series. Produced at most once
/// per direction change, in candle-close order per series.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipEvent {
    pub pair: PairInterval,
    pub representation: Representation,
    pub direction: Direction,
    /// Close of the source candle that triggered the flip.
    pub close: f64,
    pub close_time_ms: i64,
}
