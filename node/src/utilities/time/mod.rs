use chrono::Utc;

pub struct BlockManagerTime;

impl BlockManagerTime {
    /// Microseconds since the unix epoch.
    pub fn now() -> u64 {
        let now = Utc::now();
        now.timestamp() as u64 * 1_000_000 + u64::from(now.timestamp_subsec_micros())
    }
}
