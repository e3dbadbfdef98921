use {
    crate::utils::TimeUtils,
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter},
};

/// One tracked market stream: trading pair plus candle interval.
/// Used as the registry key for pipeline instances.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq)]
pub struct PairInterval {
    pub name: String,
    pub interval_ms: i64,
}

impl PairInterval {
    pub fn new(name: impl Into<String>, interval_ms: i64) -> Self {
        PairInterval {
            name: name.into(),
            interval_ms,
        }
    }

    // The name we pass into the Binance API (not necessarily display name)
    pub(crate) fn bn_name(&self) -> &str {
        &self.name
    }

    /// Lowercase stream id used in combined websocket URLs,
    /// e.g. `ethusdt@kline_1m`.
    pub fn stream_id(&self) -> String {
        format!(
            "{}@kline_{}",
            self.name.to_lowercase(),
            TimeUtils::interval_to_string(self.interval_ms)
        )
    }
}

impl std::fmt::Display for PairInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.name,
            TimeUtils::interval_to_string(self.interval_ms)
        )
    }
}

/// Which candle series a pipeline stage runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Representation {
    #[serde(rename = "standard")]
    #[strum(to_string = "Japanese")]
    Standard,
    #[serde(rename = "heikin_ashi")]
    #[strum(to_string = "Heikin Ashi")]
    HeikinAshi,
}
