use chrono::Utc;

pub struct SequencerTime;

impl SequencerTime {
    pub fn now() -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}
