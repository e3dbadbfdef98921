// Domain types and value objects
mod candle;
mod pair_interval;

pub use candle::{Candle, LiveKline};
pub use pair_interval::{PairInterval, Representation};
