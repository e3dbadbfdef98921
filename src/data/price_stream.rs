use std::time::Duration;

use {
    futures::StreamExt,
    serde::Deserialize,
    tokio::sync::mpsc,
    tokio::time::sleep,
    tokio_tungstenite::{connect_async, tungstenite::Message},
};

use crate::config::BINANCE;
use crate::domain::{LiveKline, PairInterval};
use crate::utils::TimeUtils;

/// Build the combined-stream URL subscribing every tracked stream at
/// once, e.g. `.../stream?streams=ethusdt@kline_1m/ethusdt@kline_3m`.
pub fn build_combined_stream_url(pairs: &[PairInterval]) -> String {
    let streams: Vec<String> = pairs.iter().map(|p| p.stream_id()).collect();
    format!("{}{}", BINANCE.ws.combined_base_url, streams.join("/"))
}

// Combined stream payload: {"stream": "...", "data": {"e": "kline", ...}}
#[derive(Debug, Deserialize)]
struct CombinedMessage {
    data: KlineEvent,
}

#[derive(Debug, Deserialize)]
struct KlineEvent {
    #[serde(rename = "e")]
    event: String,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: WsKline,
}

#[derive(Debug, Deserialize)]
struct WsKline {
    #[serde(rename = "t")]
    open_time_ms: i64,
    #[serde(rename = "T")]
    close_time_ms: i64,
    #[serde(rename = "i")]
    interval: String,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "x")]
    is_closed: bool,
}

fn parse_kline_message(text: &str) -> Option<LiveKline> {
    let msg: CombinedMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(_) => {
            // Combined streams also carry subscription acks etc.
            log::debug!("Ignoring non-kline websocket message");
            return None;
        }
    };
    if msg.data.event != "kline" {
        return None;
    }
    let k = msg.data.kline;
    let interval_ms = match TimeUtils::interval_from_str(&k.interval) {
        Some(ms) => ms,
        None => {
            log::warn!("Kline with unknown interval '{}'", k.interval);
            return None;
        }
    };
    let parse = |s: &str, field: &str| -> Option<f64> {
        match s.parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("Unparseable kline {} '{}'", field, s);
                None
            }
        }
    };
    Some(LiveKline {
        symbol: msg.data.symbol,
        interval_ms,
        open_time_ms: k.open_time_ms,
        close_time_ms: k.close_time_ms,
        open: parse(&k.open, "open")?,
        high: parse(&k.high, "high")?,
        low: parse(&k.low, "low")?,
        close: parse(&k.close, "close")?,
        is_closed: k.is_closed,
    })
}

/// Run the combined kline stream forever, reconnecting with exponential
/// backoff on any failure. Only closed klines are forwarded; forming
/// updates are just heartbeat noise for the indicator chain.
pub async fn run_with_reconnect(pairs: Vec<PairInterval>, tx: mpsc::Sender<LiveKline>) {
    let mut reconnect_delay = BINANCE.ws.initial_reconnect_delay_sec;
    let url = build_combined_stream_url(&pairs);

    loop {
        log::info!("Connecting to Binance stream ({} streams)...", pairs.len());
        match run_stream(&url, &tx).await {
            Ok(_) => {
                log::warn!("WebSocket closed normally. Reconnecting...");
                reconnect_delay = BINANCE.ws.initial_reconnect_delay_sec;
            }
            Err(StreamLoss::Transport(e)) => {
                log::error!(
                    "WebSocket connection failed: {}. Retrying in {}s...",
                    e,
                    reconnect_delay
                );
            }
            Err(StreamLoss::EngineGone) => {
                log::warn!("Engine receiver dropped; stopping price stream");
                return;
            }
        }

        sleep(Duration::from_secs(reconnect_delay)).await;
        reconnect_delay = (reconnect_delay * 2).min(BINANCE.ws.max_reconnect_delay_sec);
    }
}

enum StreamLoss {
    Transport(Box<dyn std::error::Error + Send + Sync>),
    EngineGone,
}

async fn run_stream(url: &str, tx: &mpsc::Sender<LiveKline>) -> Result<(), StreamLoss> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| StreamLoss::Transport(e.into()))?;
    log::info!("WebSocket connected");

    let (_write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Some(kline) = parse_kline_message(&text) {
                    if !kline.is_closed {
                        continue;
                    }
                    // Backpressure on the engine, never data loss
                    if tx.send(kline).await.is_err() {
                        return Err(StreamLoss::EngineGone);
                    }
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => break,
            Err(e) => {
                log::error!("WebSocket error: {}", e);
                return Err(StreamLoss::Transport(e.into()));
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TimeUtils;

    #[test]
    fn builds_combined_url_for_all_streams() {
        let pairs = vec![
            PairInterval::new("ETHUSDT", TimeUtils::MS_IN_MIN),
            PairInterval::new("ETHUSDT", TimeUtils::MS_IN_15_MIN),
        ];
        let url = build_combined_stream_url(&pairs);
        assert!(url.starts_with("wss://stream.binance.com:9443/stream?streams="));
        assert!(url.ends_with("ethusdt@kline_1m/ethusdt@kline_15m"));
    }

    #[test]
    fn parses_combined_kline_payload() {
        let raw = r#"{
            "stream": "ethusdt@kline_1m",
            "data": {
                "e": "kline", "E": 1700000061000, "s": "ETHUSDT",
                "k": {
                    "t": 1700000000000, "T": 1700000059999,
                    "s": "ETHUSDT", "i": "1m",
                    "o": "2000.10", "c": "2001.50", "h": "2002.00", "l": "1999.90",
                    "v": "100.0", "x": true
                }
            }
        }"#;
        let kline = parse_kline_message(raw).unwrap();
        assert_eq!(kline.symbol, "ETHUSDT");
        assert_eq!(kline.interval_ms, TimeUtils::MS_IN_MIN);
        assert_eq!(kline.open_time_ms, 1_700_000_000_000);
        assert!(kline.is_closed);
        assert!((kline.close - 2001.5).abs() < 1e-9);
    }

    #[test]
    fn ignores_non_kline_payloads() {
        assert!(parse_kline_message(r#"{"result": null, "id": 1}"#).is_none());
        let other_event = r#"{"stream": "x", "data": {"e": "24hrTicker", "s": "ETHUSDT", "k": {
            "t": 0, "T": 0, "i": "1m", "o": "1", "h": "1", "l": "1", "c": "1", "x": false}}}"#;
        assert!(parse_kline_message(other_event).is_none());
    }
}
