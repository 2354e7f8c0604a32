use std::collections::VecDeque;

use crate::constants::ITERATION_RECORDS_MAX;
use crate::types::{IterationOutcome, IterationRecord};

/// 엔진 누적 통계 + 최근 틱 기록 캐시
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub iterations: u64,
    pub executed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub no_profitable: u64,
    /// 관측된 최고 수익률 (프로브 기준 아님, 틱 결과 기준)
    pub best_profit_pct_seen: f64,
    pub realized_profit_usd: f64,
    records: VecDeque<IterationRecord>,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            iterations: 0,
            executed: 0,
            failed: 0,
            skipped: 0,
            no_profitable: 0,
            best_profit_pct_seen: 0.0,
            realized_profit_usd: 0.0,
            records: VecDeque::with_capacity(ITERATION_RECORDS_MAX),
        }
    }

    pub fn apply(&mut self, record: &IterationRecord) {
        self.iterations += 1;
        match &record.outcome {
            IterationOutcome::NoProfitable => self.no_profitable += 1,
            IterationOutcome::Executed {
                profit_pct,
                profit_usd,
                ..
            } => {
                self.executed += 1;
                if *profit_pct > self.best_profit_pct_seen {
                    self.best_profit_pct_seen = *profit_pct;
                }
                if *profit_usd > 0.0 {
                    self.realized_profit_usd += profit_usd;
                }
            }
            IterationOutcome::Failed { .. } => self.failed += 1,
            IterationOutcome::Skipped { .. } => self.skipped += 1,
        }

        self.records.push_back(record.clone());
        while self.records.len() > ITERATION_RECORDS_MAX {
            self.records.pop_front();
        }
    }

    pub fn recent(&self, n: usize) -> Vec<IterationRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    pub fn records_len(&self) -> usize {
        self.records.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "틱 {} | 체결 {} | 실패 {} | 스킵 {} | 무수익 {} | 최고 {:.4}% | 누적 ${:.4}",
            self.iterations,
            self.executed,
            self.failed,
            self.skipped,
            self.no_profitable,
            self.best_profit_pct_seen,
            self.realized_profit_usd
        )
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SkipReason, SubmitMethod};
    use chrono::Utc;

    fn record(outcome: IterationOutcome) -> IterationRecord {
        IterationRecord::new(1, Utc::now(), "SOL -> USDC -> SOL", None, outcome)
    }

    #[test]
    fn test_counters_by_outcome() {
        let mut stats = EngineStats::new();
        stats.apply(&record(IterationOutcome::NoProfitable));
        stats.apply(&record(IterationOutcome::Skipped {
            reason: SkipReason::BusyExecuting,
        }));
        stats.apply(&record(IterationOutcome::Executed {
            profit_pct: 0.42,
            profit_usd: 1.5,
            txids: vec!["tx".to_string()],
            method: SubmitMethod::Simulation,
        }));

        assert_eq!(stats.iterations, 3);
        assert_eq!(stats.no_profitable, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.executed, 1);
        assert_eq!(stats.best_profit_pct_seen, 0.42);
        assert_eq!(stats.realized_profit_usd, 1.5);
    }

    #[test]
    fn test_losses_do_not_reduce_realized_usd() {
        let mut stats = EngineStats::new();
        stats.apply(&record(IterationOutcome::Executed {
            profit_pct: -100.0,
            profit_usd: -5.0,
            txids: vec![],
            method: SubmitMethod::StandardRpc,
        }));
        // 잔고 추적은 양의 실현 수익만 더한다
        assert_eq!(stats.realized_profit_usd, 0.0);
        assert_eq!(stats.best_profit_pct_seen, 0.0);
    }

    #[test]
    fn test_record_cache_is_bounded() {
        let mut stats = EngineStats::new();
        for _ in 0..(ITERATION_RECORDS_MAX + 50) {
            stats.apply(&record(IterationOutcome::NoProfitable));
        }
        assert_eq!(stats.records_len(), ITERATION_RECORDS_MAX);
        assert_eq!(stats.iterations, (ITERATION_RECORDS_MAX + 50) as u64);
    }
}
