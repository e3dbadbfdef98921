use {
    anyhow::{Context, Result, bail},
    serde::{Deserialize, Serialize},
    std::path::Path,
};

use crate::domain::{PairInterval, Representation};
use crate::utils::TimeUtils;

/// What to do when the feed skips one or more candle buckets.
///
/// `FlatFill` inserts synthetic flat candles (O=H=L=C=last close) for the
/// missing buckets so ATR and lookback indices stay aligned with wall-clock
/// time. `Skip` appends the next real candle directly, which shrinks the
/// effective history around the gap. FlatFill is the default; the two
/// policies produce different ATR values after a gap, so the choice is
/// surfaced here rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    #[default]
    FlatFill,
    Skip,
}

/// One (symbol, interval) subscription and its indicator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSpec {
    pub symbol: String,
    /// Binance shorthand, e.g. "1m", "15m".
    pub interval: String,
    pub representations: Vec<Representation>,
    pub multiplier: f64,
}

impl StreamSpec {
    fn new(symbol: &str, interval: &str, representations: &[Representation], multiplier: f64) -> Self {
        StreamSpec {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            representations: representations.to_vec(),
            multiplier,
        }
    }

    pub fn pair_interval(&self) -> Result<PairInterval> {
        let interval_ms = TimeUtils::interval_from_str(&self.interval)
            .with_context(|| format!("Unsupported interval '{}' for {}", self.interval, self.symbol))?;
        Ok(PairInterval::new(self.symbol.to_uppercase(), interval_ms))
    }
}

/// Runtime settings. Defaults mirror the streams the bot has always
/// watched; a JSON file passed via `--config` overrides any field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub atr_period: usize,
    pub lookback: usize,
    /// Candles pulled over REST at startup. Must cover the warm-up window.
    pub history_limit: usize,
    /// Whether the first direction established after a cold warm-up fires
    /// an alert, or only subsequent flips do.
    pub alert_on_first_signal: bool,
    pub gap_policy: GapPolicy,
    pub streams: Vec<StreamSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        use Representation::{HeikinAshi, Standard};
        Settings {
            atr_period: 22,
            lookback: 22,
            history_limit: 200,
            alert_on_first_signal: false,
            gap_policy: GapPolicy::FlatFill,
            streams: vec![
                StreamSpec::new("ETHUSDT", "1m", &[Standard, HeikinAshi], 4.0),
                StreamSpec::new("ETHUSDT", "3m", &[Standard], 4.0),
                StreamSpec::new("ETHUSDT", "5m", &[Standard], 4.0),
                StreamSpec::new("ETHUSDT", "15m", &[Standard], 3.0),
            ],
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", p.display()))?
            }
            None => Settings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Candles required before both stop lines are defined: the ATR needs
    /// `atr_period` candles, the extrema need `lookback`, and the trend
    /// rule reads the previous candle's stops.
    pub fn warmup_len(&self) -> usize {
        self.atr_period.max(self.lookback) + 1
    }

    fn validate(&self) -> Result<()> {
        if self.atr_period < 2 {
            bail!("atr_period must be at least 2 (got {})", self.atr_period);
        }
        if self.lookback < 1 {
            bail!("lookback must be at least 1");
        }
        if self.history_limit < self.warmup_len() {
            bail!(
                "history_limit {} is below the warm-up window {}",
                self.history_limit,
                self.warmup_len()
            );
        }
        if self.streams.is_empty() {
            bail!("No streams configured");
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &self.streams {
            let pair = spec.pair_interval()?;
            if !seen.insert(pair.clone()) {
                bail!("Duplicate stream entry: {}", pair);
            }
            if spec.representations.is_empty() {
                bail!("{}: at least one representation required", pair);
            }
            if !(spec.multiplier.is_finite() && spec.multiplier > 0.0) {
                bail!("{}: multiplier must be positive (got {})", pair, spec.multiplier);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn rejects_short_history() {
        let settings = Settings {
            history_limit: 10,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_streams() {
        let mut settings = Settings::default();
        let dup = settings.streams[0].clone();
        settings.streams.push(dup);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn parses_override_file_shape() {
        let raw = r#"{
            "atr_period": 14,
            "streams": [
                {"symbol": "btcusdt", "interval": "5m", "representations": ["standard"], "multiplier": 3.0}
            ]
        }"#;
        let settings: Settings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.atr_period, 14);
        // Unspecified fields fall back to defaults
        assert_eq!(settings.lookback, 22);
        let pair = settings.streams[0].pair_interval().unwrap();
        assert_eq!(pair.name, "BTCUSDT");
    }
}
