use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};

use crate::common::time::Clock;

/// 수동 전진 시계 - 보존 기간/신선도 테스트용
pub struct ManualClock {
    base_instant: Instant,
    base_wall: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base_instant: Instant::now(),
            // 고정 기준점 - 테스트 결정성
            base_wall: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().expect("clock lock");
        *offset += duration;
    }

    pub fn advance_hours(&self, hours: u64) {
        self.advance(Duration::from_secs(hours * 3_600));
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_monotonic(&self) -> Instant {
        let offset = *self.offset.lock().expect("clock lock");
        self.base_instant + offset
    }

    fn now_wall(&self) -> DateTime<Utc> {
        let offset = *self.offset.lock().expect("clock lock");
        self.base_wall + chrono::Duration::from_std(offset).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let wall_before = clock.now_wall();
        let mono_before = clock.now_monotonic();

        clock.advance_hours(2);

        assert_eq!(clock.now_wall() - wall_before, chrono::Duration::hours(2));
        assert_eq!(
            clock.now_monotonic() - mono_before,
            Duration::from_secs(7_200)
        );
    }
}
