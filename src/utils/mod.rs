mod time_utils;

pub use time_utils::TimeUtils;
pub use time_utils::{epoch_ms_to_utc, now_timestamp_ms};
