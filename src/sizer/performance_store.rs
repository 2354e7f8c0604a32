use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::common::time::Clock;
use crate::constants::{PAIR_SAMPLES_MAX, PAIR_SAMPLE_TTL_HOURS};
use crate::types::{ProbeSample, SizeProbe};

/// (앵커, 중간자산) 페어별 성과 엔트리
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairPerformance {
    pub best_size_sol: f64,
    pub best_profit_pct: f64,
    pub recent_samples: VecDeque<ProbeSample>,
    pub total_trades: u64,
    pub successful_trades: u64,
}

impl PairPerformance {
    fn new() -> Self {
        Self {
            best_size_sol: 0.0,
            best_profit_pct: f64::MIN,
            recent_samples: VecDeque::new(),
            total_trades: 0,
            successful_trades: 0,
        }
    }

    fn push_sample(&mut self, sample: ProbeSample) {
        self.recent_samples.push_back(sample);
        while self.recent_samples.len() > PAIR_SAMPLES_MAX {
            self.recent_samples.pop_front();
        }
    }
}

/// 페어별 성과 학습 저장소
///
/// 첫 수익 프로브에서 엔트리가 생성되고, 24시간보다 새 샘플이 없으면
/// 정리 패스에서 제거된다.
pub struct PairPerformanceStore {
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, PairPerformance>>,
}

impl PairPerformanceStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 선택된 후보의 축약 샘플을 기록하고 최고 기록을 갱신
    ///
    /// `best_size`/`best_profit_pct`는 엄격히 개선될 때만 교체된다.
    pub async fn record_selection(&self, pair_key: &str, probe: &SizeProbe) {
        let sample = ProbeSample {
            timestamp: self.clock.now_wall(),
            size_sol: probe.size_sol,
            profit_pct: probe.profit_pct,
            profit_usd: probe.profit_usd,
            actual: false,
            success: probe.success,
        };

        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(pair_key.to_string())
            .or_insert_with(PairPerformance::new);
        if probe.profit_pct > entry.best_profit_pct {
            entry.best_profit_pct = probe.profit_pct;
            entry.best_size_sol = probe.size_sol;
        }
        entry.push_sample(sample);
    }

    /// 체결 결과 반영 - 실제 수익률 샘플과 거래 카운터
    pub async fn update_actual(
        &self,
        pair_key: &str,
        size_sol: f64,
        realized_profit_pct: f64,
        success: bool,
    ) {
        let sample = ProbeSample {
            timestamp: self.clock.now_wall(),
            size_sol,
            profit_pct: realized_profit_pct,
            profit_usd: 0.0,
            actual: true,
            success,
        };

        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(pair_key.to_string())
            .or_insert_with(PairPerformance::new);
        entry.total_trades += 1;
        if success {
            entry.successful_trades += 1;
        }
        entry.push_sample(sample);
    }

    pub async fn get(&self, pair_key: &str) -> Option<PairPerformance> {
        self.entries.read().await.get(pair_key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 모든 샘플이 24시간보다 오래된 엔트리 제거
    pub async fn cleanup_old(&self) {
        let cutoff = self.clock.now_wall() - chrono::Duration::hours(PAIR_SAMPLE_TTL_HOURS);
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| {
            entry
                .recent_samples
                .iter()
                .any(|sample| sample.timestamp > cutoff)
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!("🧹 성과 엔트리 {}건 정리", removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::SystemClock;
    use crate::mocks::ManualClock;

    fn probe(size: f64, pct: f64, usd: f64) -> SizeProbe {
        SizeProbe {
            size_sol: size,
            size_raw: (size * 1e9) as u64,
            leg1: None,
            leg2: None,
            profit_raw: 0,
            profit_bps: (pct * 100.0) as i64,
            profit_pct: pct,
            profit_usd: usd,
            total_value_usd: size * 100.0,
            total_impact_pct: 0.1,
            meets_pct: true,
            meets_usd: true,
            meets_impact: true,
            success: true,
            failure: None,
        }
    }

    #[tokio::test]
    async fn test_best_updates_only_on_strict_improvement() {
        let store = PairPerformanceStore::new(Arc::new(SystemClock));
        store.record_selection("USDC", &probe(0.05, 0.5, 1.0)).await;
        store.record_selection("USDC", &probe(0.1, 0.5, 2.0)).await; // 같은 수익률 - 교체 안 됨
        let entry = store.get("USDC").await.unwrap();
        assert_eq!(entry.best_size_sol, 0.05);
        assert_eq!(entry.best_profit_pct, 0.5);

        store.record_selection("USDC", &probe(0.08, 0.7, 2.0)).await;
        let entry = store.get("USDC").await.unwrap();
        assert_eq!(entry.best_size_sol, 0.08);
        assert_eq!(entry.best_profit_pct, 0.7);
    }

    #[tokio::test]
    async fn test_samples_are_fifo_capped() {
        let store = PairPerformanceStore::new(Arc::new(SystemClock));
        for i in 0..(PAIR_SAMPLES_MAX + 30) {
            store
                .record_selection("USDC", &probe(0.01 + i as f64 * 1e-6, 0.4, 1.0))
                .await;
        }
        let entry = store.get("USDC").await.unwrap();
        assert_eq!(entry.recent_samples.len(), PAIR_SAMPLES_MAX);
        // 가장 오래된 것부터 밀려난다
        let newest = entry.recent_samples.back().unwrap();
        assert!(newest.size_sol > 0.01);
    }

    #[tokio::test]
    async fn test_update_actual_counts_trades() {
        let store = PairPerformanceStore::new(Arc::new(SystemClock));
        store.update_actual("USDC", 0.05, 0.42, true).await;
        store.update_actual("USDC", 0.05, -100.0, false).await;
        let entry = store.get("USDC").await.unwrap();
        assert_eq!(entry.total_trades, 2);
        assert_eq!(entry.successful_trades, 1);
        assert!(entry.recent_samples.iter().all(|s| s.actual));
    }

    #[tokio::test]
    async fn test_cleanup_removes_fully_stale_entries() {
        let clock = Arc::new(ManualClock::new());
        let store = PairPerformanceStore::new(clock.clone());

        store.record_selection("STALE", &probe(0.05, 0.5, 1.0)).await;
        clock.advance_hours(25);
        store.record_selection("FRESH", &probe(0.05, 0.5, 1.0)).await;

        store.cleanup_old().await;
        assert!(store.get("STALE").await.is_none());
        assert!(store.get("FRESH").await.is_some());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_cleanup_twice_is_noop() {
        let clock = Arc::new(ManualClock::new());
        let store = PairPerformanceStore::new(clock.clone());
        store.record_selection("A", &probe(0.05, 0.5, 1.0)).await;
        clock.advance_hours(25);
        store.cleanup_old().await;
        let after_first = store.len().await;
        store.cleanup_old().await;
        assert_eq!(store.len().await, after_first);
    }
}
