use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 단일 비행 가드
///
/// compare-exchange로 획득하고 Drop에서 해제한다. 어떤 경로로 틱이
/// 끝나든(성공, 실패, 에러) 플래그가 반드시 풀린다.
pub struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    /// 획득 시도 - 이미 실행 중이면 None
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(Self {
                flag: Arc::clone(flag),
            })
        } else {
            None
        }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = FlightGuard::try_acquire(&flag);
        assert!(guard.is_some());
        assert!(FlightGuard::try_acquire(&flag).is_none());
        drop(guard);
        assert!(FlightGuard::try_acquire(&flag).is_some());
    }

    #[test]
    fn test_concurrent_acquire_has_exactly_one_winner() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::new();
        for _ in 0..32 {
            let flag = Arc::clone(&flag);
            // 가드를 반환해 조인 전까지 살려둔다 - 승자는 한 명만 나올 수 있다
            handles.push(std::thread::spawn(move || FlightGuard::try_acquire(&flag)));
        }
        let guards: Vec<Option<FlightGuard>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = guards.iter().filter(|g| g.is_some()).count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_release_happens_on_panic_path() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&flag);
        let result = std::panic::catch_unwind(move || {
            let _guard = FlightGuard::try_acquire(&flag_clone).unwrap();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
