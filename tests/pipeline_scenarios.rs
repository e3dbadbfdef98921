//! End-to-end scenarios driving a full pipeline instance with synthetic
//! kline feeds: warm-up, trend flips, gap handling and snapshot resume.

use chandelier_sentinel::config::{Settings, StreamSpec};
use chandelier_sentinel::data::SnapshotStore;
use chandelier_sentinel::domain::{Candle, LiveKline, Representation};
use chandelier_sentinel::engine::FlipEvent;
use chandelier_sentinel::indicator::Direction;
use chandelier_sentinel::PipelineInstance;

const MIN: i64 = 60_000;

fn settings(alert_on_first: bool) -> Settings {
    Settings {
        atr_period: 5,
        lookback: 5,
        history_limit: 50,
        alert_on_first_signal: alert_on_first,
        ..Settings::default()
    }
}

fn spec() -> StreamSpec {
    StreamSpec {
        symbol: "TESTUSDT".to_string(),
        interval: "1m".to_string(),
        representations: vec![Representation::Standard],
        multiplier: 3.0,
    }
}

fn instance(alert_on_first: bool) -> PipelineInstance {
    let spec = spec();
    let settings = settings(alert_on_first);
    let pair = spec.pair_interval().unwrap();
    PipelineInstance::new(pair, &spec, &settings)
}

fn kline(minute: i64, o: f64, h: f64, l: f64, c: f64) -> LiveKline {
    LiveKline {
        symbol: "TESTUSDT".to_string(),
        interval_ms: MIN,
        open_time_ms: minute * MIN,
        close_time_ms: (minute + 1) * MIN - 1,
        open: o,
        high: h,
        low: l,
        close: c,
        is_closed: true,
    }
}

/// Minutes 0..=14 trend up 10/candle, 15..=29 collapse 25/candle.
fn two_phase_feed() -> Vec<LiveKline> {
    let mut feed = Vec::new();
    for m in 0..15 {
        let c = 100.0 + m as f64 * 10.0;
        feed.push(kline(m, c - 10.0, c + 1.0, c - 11.0, c));
    }
    for m in 15..30 {
        let c = 240.0 - (m - 14) as f64 * 25.0;
        feed.push(kline(m, c + 25.0, c + 26.0, c - 1.0, c));
    }
    feed
}

fn drive(p: &mut PipelineInstance, feed: &[LiveKline]) -> Vec<FlipEvent> {
    let mut events = Vec::new();
    for k in feed {
        events.extend(p.on_kline(k));
    }
    events
}

#[test]
fn reports_each_reversal_exactly_once() {
    let mut p = instance(true);
    let events = drive(&mut p, &two_phase_feed());

    // ATR period and lookback are both 5: stops exist from minute 4, the
    // trend rule first fires on minute 5, and the collapse crosses the
    // ratcheted long stop on minute 16.
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].direction, Direction::Up);
    assert_eq!(events[0].close_time_ms, 6 * MIN - 1);
    assert_eq!(events[1].direction, Direction::Down);
    assert!((events[1].close - 190.0).abs() < 1e-9);
    assert_eq!(events[1].close_time_ms, 17 * MIN - 1);

    assert!(events.windows(2).all(|w| w[0].close_time_ms < w[1].close_time_ms));
    assert_eq!(p.directions(), vec![(Representation::Standard, Direction::Down)]);
}

#[test]
fn first_direction_is_silent_by_default() {
    let mut p = instance(false);
    let events = drive(&mut p, &two_phase_feed());

    // The warm-up Up direction is established but not reported; only the
    // genuine reversal alerts.
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].direction, Direction::Down);
}

#[test]
fn replayed_history_never_alerts() {
    let feed = two_phase_feed();
    let history: Vec<Candle> = feed.iter().map(Candle::from).collect();

    let mut p = instance(true);
    assert_eq!(p.replay(&history), 30);
    assert_eq!(p.directions(), vec![(Representation::Standard, Direction::Down)]);

    // Continuing the established downtrend after the replay is quiet
    let next = kline(30, -135.0, -134.0, -161.0, -160.0);
    assert!(p.on_kline(&next).is_empty());
}

#[test]
fn gap_fill_matches_an_explicit_flat_feed() {
    let feed = two_phase_feed();

    // Pipeline A never sees minutes 8 and 9; the aggregator fills them.
    let mut a = instance(false);
    let mut a_events = Vec::new();
    for k in feed.iter().filter(|k| k.open_time_ms != 8 * MIN && k.open_time_ms != 9 * MIN) {
        a_events.extend(a.on_kline(k));
    }

    // Pipeline B is fed the same flat candles explicitly.
    let mut b = instance(false);
    let mut b_events = Vec::new();
    for k in &feed {
        let m = k.open_time_ms / MIN;
        if m == 8 || m == 9 {
            let last_close = 170.0; // close of minute 7
            b_events.extend(b.on_kline(&kline(m, last_close, last_close, last_close, last_close)));
        } else {
            b_events.extend(b.on_kline(k));
        }
    }

    assert_eq!(a_events, b_events);
    assert_eq!(a, b);
}

#[test]
fn snapshot_resume_preserves_flip_deduplication() {
    let feed = two_phase_feed();
    let dir = std::env::temp_dir().join(format!("ce_resume_test_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let store = SnapshotStore::new(&dir);

    // Run the uptrend, persist, then "restart" from disk.
    let mut original = instance(false);
    drive(&mut original, &feed[..15]);
    store.save(&original).unwrap();

    let pair = spec().pair_interval().unwrap();
    let mut resumed = store.load(&pair).unwrap().unwrap();
    assert_eq!(resumed, original);

    // The restarted instance behaves exactly like the uninterrupted one.
    let tail_resumed = drive(&mut resumed, &feed[15..]);
    let tail_original = drive(&mut original, &feed[15..]);
    assert_eq!(tail_resumed, tail_original);
    assert_eq!(tail_resumed.len(), 1);
    assert_eq!(tail_resumed[0].direction, Direction::Down);

    let _ = std::fs::remove_dir_all(&dir);
}
