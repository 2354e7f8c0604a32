use std::time::Instant;

use chrono::{DateTime, Utc};

/// 시간 소스 추상화
///
/// 재시도 백오프와 쿨다운은 단조 시간(`Instant`), 로그와 샘플 타임스탬프는
/// 벽시계 시간(`DateTime<Utc>`)을 사용한다. 테스트에서는 mocks의
/// `ManualClock`으로 교체한다.
pub trait Clock: Send + Sync {
    fn now_monotonic(&self) -> Instant;
    fn now_wall(&self) -> DateTime<Utc>;
}

/// 운영용 시스템 시계
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_monotonic(&self) -> Instant {
        Instant::now()
    }

    fn now_wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Get current timestamp (seconds)
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

/// Get current timestamp (milliseconds)
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}
