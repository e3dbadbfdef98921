use std::collections::HashMap;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::data::bootstrap;
use crate::data::snapshot::SnapshotStore;
use crate::domain::{LiveKline, PairInterval};
use crate::indicator::{Direction, PipelineInstance};
use crate::utils::now_timestamp_ms;

use super::messages::FlipEvent;

/// Depth of the flip-event handoff queue. Alerts are rare (one per trend
/// reversal per series) so a shallow bounded queue is plenty; if the
/// notification channel ever wedges, flips are dropped rather than
/// stalling candle processing.
pub const FLIP_QUEUE_DEPTH: usize = 64;

/// Owns one pipeline instance per tracked (symbol, timeframe), routes
/// closed klines to them in arrival order, and hands flip events to the
/// dispatcher without ever blocking on it.
pub struct AlertEngine {
    pipelines: HashMap<PairInterval, PipelineInstance>,
    kline_rx: mpsc::Receiver<LiveKline>,
    flip_tx: mpsc::Sender<FlipEvent>,
    snapshots: SnapshotStore,
}

impl AlertEngine {
    pub fn new(
        pipelines: HashMap<PairInterval, PipelineInstance>,
        kline_rx: mpsc::Receiver<LiveKline>,
        flip_tx: mpsc::Sender<FlipEvent>,
        snapshots: SnapshotStore,
    ) -> Self {
        AlertEngine {
            pipelines,
            kline_rx,
            flip_tx,
            snapshots,
        }
    }

    pub async fn run(mut self) {
        while let Some(kline) = self.kline_rx.recv().await {
            self.on_kline(kline);
        }
        log::warn!("Kline channel closed; engine stopping");
    }

    fn on_kline(&mut self, kline: LiveKline) {
        if !kline.is_closed {
            return;
        }
        let key = PairInterval::new(kline.symbol.clone(), kline.interval_ms);
        let Some(pipeline) = self.pipelines.get_mut(&key) else {
            log::debug!("Ignoring kline for unsubscribed stream {}", key);
            return;
        };

        let events = pipeline.on_kline(&kline);

        // Snapshot after every closed candle so a restart resumes from
        // here instead of re-warming.
        if let Err(e) = self.snapshots.save(pipeline) {
            log::error!("Snapshot save failed for {}: {:#}", key, e);
        }

        for event in events {
            log::info!(
                "Flip: {} ({}) -> {} at {:.4}",
                event.pair,
                event.representation,
                event.direction,
                event.close
            );
            self.emit(event);
        }
    }

    fn emit(&self, event: FlipEvent) {
        use mpsc::error::TrySendError;
        match self.flip_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(ev)) => {
                log::warn!(
                    "Alert queue full; dropping flip for {} ({})",
                    ev.pair,
                    ev.representation
                );
            }
            Err(TrySendError::Closed(_)) => {
                log::error!("Alert channel closed; dispatcher is gone");
            }
        }
    }
}

/// Build one pipeline per configured stream: resume from a compatible,
/// fresh snapshot when allowed, otherwise bootstrap history over REST and
/// replay it. Returns the pipelines plus any initial-direction events the
/// `alert_on_first_signal` policy asks for.
pub async fn prepare_pipelines(
    settings: &Settings,
    resume: bool,
    store: &SnapshotStore,
) -> Result<(HashMap<PairInterval, PipelineInstance>, Vec<FlipEvent>)> {
    let mut pipelines = HashMap::new();
    let mut initial_events = Vec::new();

    for spec in &settings.streams {
        let pair = spec.pair_interval()?;

        let resumed = if resume {
            load_snapshot(store, &pair, spec, settings)
        } else {
            None
        };

        let instance = match resumed {
            Some(instance) => {
                log::info!("Resumed {} from snapshot", pair);
                instance
            }
            None => {
                let candles = bootstrap::fetch_recent_candles(&pair, settings.history_limit)
                    .await
                    .with_context(|| format!("Bootstrap failed for {}", pair))?;
                let mut fresh = PipelineInstance::new(pair.clone(), spec, settings);
                let replayed = fresh.replay(&candles);
                for (representation, direction) in fresh.directions() {
                    log::info!(
                        "Bootstrapped {} ({}) with {} candles; initial direction {}",
                        pair,
                        representation,
                        replayed,
                        direction
                    );
                    if settings.alert_on_first_signal && direction != Direction::Unknown {
                        if let Some((_, close)) = fresh.last_closed() {
                            initial_events.push(FlipEvent {
                                pair: pair.clone(),
                                representation,
                                direction,
                                close,
                                close_time_ms: now_timestamp_ms(),
                            });
                        }
                    }
                }
                fresh
            }
        };

        pipelines.insert(pair, instance);
    }

    Ok((pipelines, initial_events))
}

fn load_snapshot(
    store: &SnapshotStore,
    pair: &PairInterval,
    spec: &crate::config::StreamSpec,
    settings: &Settings,
) -> Option<PipelineInstance> {
    let saved = match store.load(pair) {
        Ok(found) => found?,
        Err(e) => {
            log::warn!("Snapshot load failed for {}: {:#}", pair, e);
            return None;
        }
    };

    if !saved.compatible_with(spec, settings) {
        log::info!("Snapshot for {} has stale configuration; re-bootstrapping", pair);
        return None;
    }

    // A snapshot older than the bootstrap depth is worthless: the gap
    // fill would fabricate more history than a fresh REST pull provides.
    let (last_open, _) = saved.last_closed()?;
    let max_age_ms = pair.interval_ms * settings.history_limit as i64;
    if now_timestamp_ms() - last_open > max_age_ms {
        log::info!("Snapshot for {} is too old; re-bootstrapping", pair);
        return None;
    }

    Some(saved)
}
