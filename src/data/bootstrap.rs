use {
    anyhow::{Result, bail},
    binance_sdk::{
        config::ConfigurationRestApi,
        errors::{self, ConnectorError},
        spot::{
            SpotRestApi,
            rest_api::{KlinesIntervalEnum, KlinesItemInner, KlinesParams, RestApi},
        },
    },
    std::{convert::TryFrom, error::Error, fmt},
};

use crate::{
    config::{BINANCE, BinanceApiConfig},
    domain::{Candle, PairInterval},
    utils::{TimeUtils, now_timestamp_ms},
};

pub fn try_interval_from_ms(ms: i64) -> Result<KlinesIntervalEnum, String> {
    use TimeUtils as T;
    match ms {
        T::MS_IN_S => Ok(KlinesIntervalEnum::Interval1s),
        T::MS_IN_MIN => Ok(KlinesIntervalEnum::Interval1m),
        T::MS_IN_3_MIN => Ok(KlinesIntervalEnum::Interval3m),
        T::MS_IN_5_MIN => Ok(KlinesIntervalEnum::Interval5m),
        T::MS_IN_15_MIN => Ok(KlinesIntervalEnum::Interval15m),
        T::MS_IN_30_MIN => Ok(KlinesIntervalEnum::Interval30m),
        T::MS_IN_H => Ok(KlinesIntervalEnum::Interval1h),
        T::MS_IN_2_H => Ok(KlinesIntervalEnum::Interval2h),
        T::MS_IN_4_H => Ok(KlinesIntervalEnum::Interval4h),
        T::MS_IN_6_H => Ok(KlinesIntervalEnum::Interval6h),
        T::MS_IN_8_H => Ok(KlinesIntervalEnum::Interval8h),
        T::MS_IN_12_H => Ok(KlinesIntervalEnum::Interval12h),
        T::MS_IN_D => Ok(KlinesIntervalEnum::Interval1d),
        T::MS_IN_3_D => Ok(KlinesIntervalEnum::Interval3d),
        T::MS_IN_W => Ok(KlinesIntervalEnum::Interval1w),
        _ => Err(format!("Unsupported interval: {}ms", ms)),
    }
}

#[derive(Debug)]
pub enum KlineFetchError {
    InvalidRow(String),
    ConnectionFailed(String),
}

impl fmt::Display for KlineFetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> std::fmt::Result {
        match self {
            KlineFetchError::InvalidRow(field) => write!(f, "Invalid kline field: {}", field),
            KlineFetchError::ConnectionFailed(msg) => {
                write!(f, "Binance API connection failed: {}.", msg)
            }
        }
    }
}

impl Error for KlineFetchError {}

fn item_as_price(item: Option<KlinesItemInner>) -> Option<f64> {
    item.and_then(|inner| {
        if let KlinesItemInner::String(s) = inner {
            s.parse::<f64>().ok()
        } else {
            None
        }
    })
}

fn item_as_time(item: Option<KlinesItemInner>) -> Option<i64> {
    item.and_then(|inner| {
        if let KlinesItemInner::Integer(ms) = inner {
            Some(ms)
        } else {
            None
        }
    })
}

impl TryFrom<Vec<KlinesItemInner>> for Candle {
    type Error = KlineFetchError;

    // Row layout: open_time, open, high, low, close, volume, close_time, ...
    fn try_from(row: Vec<KlinesItemInner>) -> Result<Self, Self::Error> {
        let mut items = row.into_iter();
        let open_time_ms = item_as_time(items.next())
            .ok_or_else(|| KlineFetchError::InvalidRow("open_time".to_string()))?;
        let open = item_as_price(items.next())
            .ok_or_else(|| KlineFetchError::InvalidRow("open".to_string()))?;
        let high = item_as_price(items.next())
            .ok_or_else(|| KlineFetchError::InvalidRow("high".to_string()))?;
        let low = item_as_price(items.next())
            .ok_or_else(|| KlineFetchError::InvalidRow("low".to_string()))?;
        let close = item_as_price(items.next())
            .ok_or_else(|| KlineFetchError::InvalidRow("close".to_string()))?;
        let _volume = items.next();
        let close_time_ms = item_as_time(items.next())
            .ok_or_else(|| KlineFetchError::InvalidRow("close_time".to_string()))?;

        Ok(Candle::new(open_time_ms, close_time_ms, open, high, low, close))
    }
}

async fn configure_binance_client() -> Result<RestApi> {
    let config = BinanceApiConfig::default();
    let rest_conf = ConfigurationRestApi::builder()
        .timeout(config.timeout_ms)
        .retries(config.retries)
        .backoff(config.backoff_ms)
        .build()?;
    Ok(SpotRestApi::production(rest_conf))
}

async fn fetch_kline_rows(
    rest_client: &RestApi,
    params: KlinesParams,
    pair_interval: &PairInterval,
) -> Result<Vec<Vec<KlinesItemInner>>> {
    match rest_client.klines(params).await {
        Ok(r) => Ok(r.data().await?),
        Err(e) => {
            if let Some(conn_err) = e.downcast_ref::<errors::ConnectorError>() {
                match conn_err {
                    ConnectorError::TooManyRequestsError(msg) => {
                        log::warn!("{} Rate limit exceeded. {}", pair_interval, msg);
                    }
                    ConnectorError::NetworkError(msg) => {
                        log::error!("{} Network error: Check your connection. {}", pair_interval, msg);
                    }
                    ConnectorError::ServerError { msg, status_code } => {
                        log::error!("{} Server error: {} (status code: {:?})", pair_interval, msg, status_code);
                    }
                    other => {
                        log::error!("{} Binance API error: {:?}", pair_interval, other);
                    }
                }
                Err(anyhow::Error::new(KlineFetchError::ConnectionFailed(conn_err.to_string()))
                    .context(format!("Binance API call failed for {}", pair_interval)))
            } else {
                Err(anyhow::Error::new(KlineFetchError::ConnectionFailed(e.to_string()))
                    .context(format!("Unexpected error during API call for {}", pair_interval)))
            }
        }
    }
}

/// Pull the most recent `limit` candles over REST for warm-up replay.
/// The final kline is still forming and is dropped; the live stream will
/// deliver its closed version.
pub async fn fetch_recent_candles(pair_interval: &PairInterval, limit: usize) -> Result<Vec<Candle>> {
    let rest_client = configure_binance_client().await?;

    let interval = try_interval_from_ms(pair_interval.interval_ms)
        .map_err(|e| anyhow::anyhow!(e))?;
    let batch = limit.min(BINANCE.limits.klines_limit as usize) as i32;

    let params = KlinesParams::builder(pair_interval.bn_name().to_string(), interval)
        .limit(batch)
        .build()?;

    let rows = fetch_kline_rows(&rest_client, params, pair_interval).await?;
    let mut candles = rows
        .into_iter()
        .map(Candle::try_from)
        .collect::<Result<Vec<Candle>, KlineFetchError>>()
        .map_err(|e| anyhow::Error::new(e).context(format!("{} kline parse failed", pair_interval)))?;

    if let Some(last) = candles.last() {
        if last.close_time_ms > now_timestamp_ms() {
            candles.pop();
        }
    }

    if candles.is_empty() {
        bail!("Binance returned zero closed klines for {}", pair_interval);
    }
    for pair in candles.windows(2) {
        if pair[1].open_time_ms <= pair[0].open_time_ms {
            bail!("Non-monotonic kline history for {}", pair_interval);
        }
    }

    Ok(candles)
}
