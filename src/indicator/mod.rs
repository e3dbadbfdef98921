// Streaming indicator engine: candle aggregation, Heikin Ashi transform,
// Wilder ATR, chandelier stops and the trend state machine.
mod aggregator;
mod atr;
mod chandelier;
mod heikin_ashi;
mod pipeline;
mod trend;
mod window;

pub use aggregator::CandleAggregator;
pub use atr::AtrState;
pub use chandelier::{ChandelierStop, StopLines};
pub use heikin_ashi::HeikinAshi;
pub use pipeline::{PipelineConfig, PipelineInstance, SeriesPipeline};
pub use trend::{Direction, TrendState};
pub use window::CandleWindow;
