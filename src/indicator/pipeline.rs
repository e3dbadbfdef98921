use serde::{Deserialize, Serialize};

use crate::config::{GapPolicy, Settings, StreamSpec};
use crate::domain::{Candle, LiveKline, PairInterval, Representation};
use crate::engine::FlipEvent;

use super::aggregator::CandleAggregator;
use super::atr::AtrState;
use super::chandelier::ChandelierStop;
use super::heikin_ashi::HeikinAshi;
use super::trend::{Direction, TrendState};
use super::window::CandleWindow;

/// Indicator tuning for one pipeline instance. Persisted with the
/// snapshot so a stale or re-tuned snapshot is never resumed silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub atr_period: usize,
    pub lookback: usize,
    pub multiplier: f64,
    pub alert_on_first: bool,
    pub gap_policy: GapPolicy,
    pub representations: Vec<Representation>,
}

impl PipelineConfig {
    pub fn from_spec(spec: &StreamSpec, settings: &Settings) -> Self {
        PipelineConfig {
            atr_period: settings.atr_period,
            lookback: settings.lookback,
            multiplier: spec.multiplier,
            alert_on_first: settings.alert_on_first_signal,
            gap_policy: settings.gap_policy,
            representations: spec.representations.clone(),
        }
    }
}

/// ATR + chandelier stops + trend machine for one candle series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPipeline {
    representation: Representation,
    lookback: usize,
    window: CandleWindow,
    atr: AtrState,
    stop: ChandelierStop,
    trend: TrendState,
}

impl SeriesPipeline {
    pub fn new(representation: Representation, config: &PipelineConfig) -> Self {
        // Window sized so ATR and extrema are always recomputable from
        // retained history alone.
        let capacity = config.atr_period.max(config.lookback) + 1;
        SeriesPipeline {
            representation,
            lookback: config.lookback,
            window: CandleWindow::new(capacity),
            atr: AtrState::new(config.atr_period),
            stop: ChandelierStop::new(config.multiplier),
            trend: TrendState::new(config.alert_on_first),
        }
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    pub fn direction(&self) -> Direction {
        self.trend.direction()
    }

    /// Process one closed candle. Returns the new direction iff this
    /// candle flipped the trend and the flip should be reported.
    pub fn update(&mut self, candle: &Candle) -> Option<Direction> {
        self.window.push(*candle);
        let atr = self.atr.update(candle);

        let (Some(atr), Some(hh), Some(ll)) = (
            atr,
            self.window.highest_high(self.lookback),
            self.window.lowest_low(self.lookback),
        ) else {
            // Warming up: no stops, no signal
            return None;
        };

        let prev_stops = self.stop.advance(candle.close, hh, ll, atr)?;
        self.trend.evaluate(candle.close, prev_stops)
    }

    fn mark_emitted(&mut self) {
        self.trend.mark_emitted();
    }
}

/// The full owned chain for one (symbol, timeframe): aggregator plus one
/// series pipeline per configured representation. Instances are
/// independent; no state is shared between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInstance {
    pair: PairInterval,
    config: PipelineConfig,
    aggregator: CandleAggregator,
    standard: Option<SeriesPipeline>,
    heikin: Option<(HeikinAshi, SeriesPipeline)>,
}

impl PipelineInstance {
    pub fn new(pair: PairInterval, spec: &StreamSpec, settings: &Settings) -> Self {
        let config = PipelineConfig::from_spec(spec, settings);
        let standard = config
            .representations
            .contains(&Representation::Standard)
            .then(|| SeriesPipeline::new(Representation::Standard, &config));
        let heikin = config
            .representations
            .contains(&Representation::HeikinAshi)
            .then(|| (HeikinAshi::new(), SeriesPipeline::new(Representation::HeikinAshi, &config)));
        let aggregator = CandleAggregator::new(pair.interval_ms, config.gap_policy);

        PipelineInstance {
            pair,
            config,
            aggregator,
            standard,
            heikin,
        }
    }

    pub fn pair(&self) -> &PairInterval {
        &self.pair
    }

    /// Whether a persisted instance still matches the live configuration.
    pub fn compatible_with(&self, spec: &StreamSpec, settings: &Settings) -> bool {
        self.config == PipelineConfig::from_spec(spec, settings)
    }

    pub fn last_closed(&self) -> Option<(i64, f64)> {
        self.aggregator.last_closed()
    }

    /// Route one live kline update. Forming updates are ignored here;
    /// only the closed update advances the indicator chain.
    pub fn on_kline(&mut self, kline: &LiveKline) -> Vec<FlipEvent> {
        if !kline.is_closed {
            return Vec::new();
        }
        let mut events = Vec::new();
        for candle in self.aggregator.push_closed(kline.into()) {
            self.process_closed(&candle, &mut events);
        }
        events
    }

    /// Route one raw price sample (tick path).
    pub fn on_price_sample(&mut self, price: f64, timestamp_ms: i64) -> Vec<FlipEvent> {
        let mut events = Vec::new();
        for candle in self.aggregator.push_sample(price, timestamp_ms) {
            self.process_closed(&candle, &mut events);
        }
        events
    }

    /// Replay bootstrap history without reporting anything; afterwards
    /// the established direction is absorbed so it never alerts by
    /// itself. Returns the number of candles replayed.
    pub fn replay(&mut self, candles: &[Candle]) -> usize {
        let mut sink = Vec::new();
        let mut count = 0;
        for candle in candles {
            for closed in self.aggregator.push_closed(*candle) {
                self.process_closed(&closed, &mut sink);
                count += 1;
            }
        }
        if let Some(series) = self.standard.as_mut() {
            series.mark_emitted();
        }
        if let Some((_, series)) = self.heikin.as_mut() {
            series.mark_emitted();
        }
        count
    }

    /// Current direction per representation (Unknown while warming up).
    pub fn directions(&self) -> Vec<(Representation, Direction)> {
        let mut out = Vec::new();
        if let Some(series) = &self.standard {
            out.push((Representation::Standard, series.direction()));
        }
        if let Some((_, series)) = &self.heikin {
            out.push((Representation::HeikinAshi, series.direction()));
        }
        out
    }

    fn process_closed(&mut self, candle: &Candle, events: &mut Vec<FlipEvent>) {
        if let Some(series) = self.standard.as_mut() {
            if let Some(direction) = series.update(candle) {
                events.push(Self::flip(&self.pair, Representation::Standard, direction, candle));
            }
        }
        if let Some((transformer, series)) = self.heikin.as_mut() {
            let ha = transformer.transform(candle);
            if let Some(direction) = series.update(&ha) {
                // Trigger price reported off the source candle, as the
                // smoothed close is not a tradable level.
                events.push(Self::flip(&self.pair, Representation::HeikinAshi, direction, candle));
            }
        }
    }

    fn flip(
        pair: &PairInterval,
        representation: Representation,
        direction: Direction,
        candle: &Candle,
    ) -> FlipEvent {
        FlipEvent {
            pair: pair.clone(),
            representation,
            direction,
            close: candle.close,
            close_time_ms: candle.close_time_ms,
        }
    }
}
