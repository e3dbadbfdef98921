use chrono::DateTime;

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_3_MIN: i64 = Self::MS_IN_MIN * 3;
    pub const MS_IN_5_MIN: i64 = Self::MS_IN_MIN * 5;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_MIN * 15;
    pub const MS_IN_30_MIN: i64 = Self::MS_IN_MIN * 30;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_2_H: i64 = Self::MS_IN_H * 2;
    pub const MS_IN_4_H: i64 = Self::MS_IN_H * 4;
    pub const MS_IN_6_H: i64 = Self::MS_IN_H * 6;
    pub const MS_IN_8_H: i64 = Self::MS_IN_H * 8;
    pub const MS_IN_12_H: i64 = Self::MS_IN_H * 12;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const MS_IN_3_D: i64 = Self::MS_IN_D * 3;
    pub const MS_IN_W: i64 = Self::MS_IN_D * 7;
    pub const ALERT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

    /// Convert interval in milliseconds to a Binance-style shorthand (e.g. `30m`, `1h`).
    pub fn interval_to_string(interval_ms: i64) -> &'static str {
        match interval_ms {
            Self::MS_IN_S => "1s",
            Self::MS_IN_MIN => "1m",
            Self::MS_IN_3_MIN => "3m",
            Self::MS_IN_5_MIN => "5m",
            Self::MS_IN_15_MIN => "15m",
            Self::MS_IN_30_MIN => "30m",
            Self::MS_IN_H => "1h",
            Self::MS_IN_2_H => "2h",
            Self::MS_IN_4_H => "4h",
            Self::MS_IN_6_H => "6h",
            Self::MS_IN_8_H => "8h",
            Self::MS_IN_12_H => "12h",
            Self::MS_IN_D => "1d",
            Self::MS_IN_3_D => "3d",
            Self::MS_IN_W => "1w",
            _ => "unknown",
        }
    }

    /// Inverse of `interval_to_string` for parsing config files.
    pub fn interval_from_str(s: &str) -> Option<i64> {
        match s {
            "1s" => Some(Self::MS_IN_S),
            "1m" => Some(Self::MS_IN_MIN),
            "3m" => Some(Self::MS_IN_3_MIN),
            "5m" => Some(Self::MS_IN_5_MIN),
            "15m" => Some(Self::MS_IN_15_MIN),
            "30m" => Some(Self::MS_IN_30_MIN),
            "1h" => Some(Self::MS_IN_H),
            "2h" => Some(Self::MS_IN_2_H),
            "4h" => Some(Self::MS_IN_4_H),
            "6h" => Some(Self::MS_IN_6_H),
            "8h" => Some(Self::MS_IN_8_H),
            "12h" => Some(Self::MS_IN_12_H),
            "1d" => Some(Self::MS_IN_D),
            "3d" => Some(Self::MS_IN_3_D),
            "1w" => Some(Self::MS_IN_W),
            _ => None,
        }
    }
}

// Time helper functions

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display purposes (alert messages, logs)
    let dt = DateTime::from_timestamp_millis(epoch_ms).unwrap_or_default();
    format!("{}", dt.format(TimeUtils::ALERT_TIME_FORMAT))
}

pub fn now_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_round_trips() {
        for ms in [
            TimeUtils::MS_IN_MIN,
            TimeUtils::MS_IN_3_MIN,
            TimeUtils::MS_IN_5_MIN,
            TimeUtils::MS_IN_15_MIN,
            TimeUtils::MS_IN_H,
            TimeUtils::MS_IN_D,
        ] {
            let s = TimeUtils::interval_to_string(ms);
            assert_eq!(TimeUtils::interval_from_str(s), Some(ms));
        }
        assert_eq!(TimeUtils::interval_from_str("7m"), None);
    }
}
