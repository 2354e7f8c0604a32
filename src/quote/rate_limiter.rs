use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::constants::QUOTE_QUEUE_TIMEOUT_SECS;
use crate::types::QuoteError;

const WINDOW: Duration = Duration::from_secs(60);

struct LimiterState {
    last_call: Option<Instant>,
    window: VecDeque<Instant>,
}

/// 견적 호출 레이트리미터
///
/// 두 제약을 함께 건다: (a) 호출 간 최소 간격, (b) 롤링 1분 윈도우 상한.
/// 초과분은 실패 대신 대기하고, 30초 넘게 대기한 요청은 타임아웃으로 버린다.
pub struct RateLimiter {
    min_interval: Duration,
    max_per_minute: usize,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64, max_per_minute: usize) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            max_per_minute,
            state: Mutex::new(LimiterState {
                last_call: None,
                window: VecDeque::new(),
            }),
        }
    }

    /// 호출 슬롯 획득 - 필요하면 대기
    pub async fn acquire(&self) -> Result<(), QuoteError> {
        let enqueued = Instant::now();
        let queue_cap = Duration::from_secs(QUOTE_QUEUE_TIMEOUT_SECS);

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();

                while let Some(front) = state.window.front() {
                    if now.duration_since(*front) >= WINDOW {
                        state.window.pop_front();
                    } else {
                        break;
                    }
                }

                let mut wait = Duration::ZERO;
                if let Some(last) = state.last_call {
                    let since = now.duration_since(last);
                    if since < self.min_interval {
                        wait = self.min_interval - since;
                    }
                }
                if state.window.len() >= self.max_per_minute {
                    if let Some(oldest) = state.window.front().copied() {
                        let until_roll = WINDOW.saturating_sub(now.duration_since(oldest));
                        if until_roll > wait {
                            wait = until_roll;
                        }
                    }
                }

                if wait.is_zero() {
                    state.last_call = Some(now);
                    state.window.push_back(now);
                    return Ok(());
                }
                wait
            };

            let waited = enqueued.elapsed();
            if waited >= queue_cap {
                return Err(QuoteError::QueueTimeout(QUOTE_QUEUE_TIMEOUT_SECS));
            }
            sleep(wait.min(queue_cap - waited)).await;
            if enqueued.elapsed() >= queue_cap {
                return Err(QuoteError::QueueTimeout(QUOTE_QUEUE_TIMEOUT_SECS));
            }
        }
    }

    pub async fn calls_in_window(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        while let Some(front) = state.window.front() {
            if now.duration_since(*front) >= WINDOW {
                state.window.pop_front();
            } else {
                break;
            }
        }
        state.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_min_interval_spacing() {
        let limiter = RateLimiter::new(2_000, 1_000);
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        // 호출 3번 = 간격 2번
        assert!(start.elapsed() >= Duration::from_millis(4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rolling_window_cap() {
        // 분당 30개 제한에서 40개 요청 - 31번째부터는
        // 윈도우가 넘어갈 때까지 디스패치되지 않아 총 60초 이상 소요
        let limiter = RateLimiter::new(0, 30);
        let start = Instant::now();
        for _ in 0..30 {
            limiter.acquire().await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.calls_in_window().await, 30);

        for _ in 0..10 {
            limiter.acquire().await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_timeout_discards_stale_request() {
        // 간격이 대기 한도보다 길면 두 번째 요청은 큐 타임아웃
        let limiter = RateLimiter::new(45_000, 1_000);
        limiter.acquire().await.unwrap();
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, QuoteError::QueueTimeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_under_limits() {
        let limiter = RateLimiter::new(0, 100);
        let start = Instant::now();
        for _ in 0..50 {
            limiter.acquire().await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
