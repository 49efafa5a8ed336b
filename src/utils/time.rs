use std::time::{SystemTime, UNIX_EPOCH};

/// return nanoseconds since the unix epoch
///
/// Saturates at `i64::MAX` and reports `0` for clocks set before the epoch.
pub fn now_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since_epoch) => i64::try_from(since_epoch.as_nanos()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

