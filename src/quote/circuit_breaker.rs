use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

use crate::types::QuoteError;

/// 브레이커 상태 기계: Closed → Open → HalfOpen → {Closed | Open}
#[derive(Debug, Clone, Copy, PartialEq)]
enum BreakerState {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

/// 견적 API 서킷 브레이커
///
/// 연속 실패가 임계값에 닿으면 열리고, 이후 모든 호출은 I/O 없이
/// `CircuitOpen`으로 즉시 실패한다. 쿨다운이 지나면 시험 호출 하나만
/// 통과시킨다(half-open). 성공이면 닫히고, 실패면 다시 열린다.
pub struct CircuitBreaker {
    threshold: u32,
    timeout: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, timeout_ms: u64) -> Self {
        Self {
            threshold,
            timeout: Duration::from_millis(timeout_ms),
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    /// 호출 허용 여부 - Open이면 I/O 없이 즉시 실패
    pub async fn check(&self) -> Result<(), QuoteError> {
        let mut state = self.state.lock().await;
        match *state {
            BreakerState::Closed { .. } => Ok(()),
            BreakerState::Open { opened_at } => {
                if opened_at.elapsed() >= self.timeout {
                    info!("🔌 서킷 브레이커 half-open - 시험 호출 1건 허용");
                    *state = BreakerState::HalfOpen;
                    Ok(())
                } else {
                    Err(QuoteError::CircuitOpen)
                }
            }
            // 시험 호출이 이미 나가 있음
            BreakerState::HalfOpen => Err(QuoteError::CircuitOpen),
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, BreakerState::HalfOpen) {
            info!("✅ 서킷 브레이커 닫힘 - 시험 호출 성공");
        }
        *state = BreakerState::Closed {
            consecutive_failures: 0,
        };
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        match *state {
            BreakerState::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.threshold {
                    warn!(
                        "🔌 서킷 브레이커 열림 - 연속 실패 {}회 (쿨다운 {:?})",
                        failures, self.timeout
                    );
                    *state = BreakerState::Open {
                        opened_at: Instant::now(),
                    };
                } else {
                    *state = BreakerState::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            BreakerState::HalfOpen => {
                warn!("🔌 서킷 브레이커 재오픈 - 시험 호출 실패");
                *state = BreakerState::Open {
                    opened_at: Instant::now(),
                };
            }
            BreakerState::Open { .. } => {}
        }
    }

    pub async fn is_open(&self) -> bool {
        matches!(*self.state.lock().await, BreakerState::Open { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(5, 60_000);
        for _ in 0..4 {
            breaker.record_failure().await;
            assert!(breaker.check().await.is_ok());
        }
        breaker.record_failure().await;
        assert!(breaker.is_open().await);
        // 열린 뒤에는 I/O 없이 즉시 실패
        for _ in 0..12 {
            assert!(matches!(
                breaker.check().await,
                Err(QuoteError::CircuitOpen)
            ));
        }
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_counter() {
        let breaker = CircuitBreaker::new(3, 60_000);
        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert!(!breaker.is_open().await);
        breaker.record_failure().await;
        assert!(breaker.is_open().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_allows_exactly_one_trial() {
        let breaker = CircuitBreaker::new(1, 60_000);
        breaker.record_failure().await;
        assert!(breaker.check().await.is_err());

        tokio::time::advance(Duration::from_millis(60_001)).await;

        // 쿨다운 경과 후 시험 호출 1건만 허용
        assert!(breaker.check().await.is_ok());
        assert!(matches!(
            breaker.check().await,
            Err(QuoteError::CircuitOpen)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_failure_reopens() {
        let breaker = CircuitBreaker::new(1, 60_000);
        breaker.record_failure().await;
        tokio::time::advance(Duration::from_millis(60_001)).await;
        assert!(breaker.check().await.is_ok());
        breaker.record_failure().await;
        assert!(breaker.is_open().await);
        // 다시 쿨다운 전이라 즉시 실패
        assert!(breaker.check().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_success_closes() {
        let breaker = CircuitBreaker::new(1, 60_000);
        breaker.record_failure().await;
        tokio::time::advance(Duration::from_millis(60_001)).await;
        assert!(breaker.check().await.is_ok());
        breaker.record_success().await;
        assert!(!breaker.is_open().await);
        assert!(breaker.check().await.is_ok());
    }
}
