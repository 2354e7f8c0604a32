use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::performance_store::PairPerformanceStore;
use crate::common::math::{
    bps_to_pct, profit_basis_points, profit_to_usd, round_size, to_raw_amount,
};
use crate::common::time::Clock;
use crate::config::{Config, SizeStrategy};
use crate::constants::PROBE_LEG_PAUSE_MS;
use crate::quote::QuoteService;
use crate::types::{SizeCandidate, SizeProbe, TokenInfo};

/// 스코어 가중치: USD 수익 / 수익률 / 거래 가치 / 가격 영향
const W_PROFIT_USD: f64 = 0.4;
const W_PROFIT_PCT: f64 = 0.3;
const W_TRADE_VALUE: f64 = 0.2;
const W_IMPACT: f64 = 0.1;

/// 동적 트레이드 사이저
pub struct DynamicSizer {
    config: Arc<Config>,
    quote: Arc<dyn QuoteService>,
    store: PairPerformanceStore,
    cancel: Arc<AtomicBool>,
}

impl DynamicSizer {
    pub fn new(
        config: Arc<Config>,
        quote: Arc<dyn QuoteService>,
        clock: Arc<dyn Clock>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            quote,
            store: PairPerformanceStore::new(clock),
            cancel,
        }
    }

    /// 프로브 사이즈 생성 - 오름차순, 중복 제거, 4자리 반올림
    pub fn generate_probe_sizes(&self) -> Vec<f64> {
        let min = self.config.trading.min_trade_size_sol;
        let max = self.config.trading.max_trade_size_sol;
        let n = self.config.sizing.size_tests;

        let mut sizes: Vec<f64> = match self.config.sizing.strategy {
            SizeStrategy::Stepped => {
                if n <= 1 {
                    vec![min]
                } else {
                    let step = (max - min) / (n - 1) as f64;
                    (0..n).map(|i| round_size(min + step * i as f64)).collect()
                }
            }
            SizeStrategy::Optimal => {
                let mut sizes = vec![round_size(min)];
                let span = max - min;
                let take = n.saturating_sub(2);
                for pct in self.config.sizing.preferred_percentages.iter().take(take) {
                    sizes.push(round_size(min + span * (*pct as f64) / 100.0));
                }
                sizes.push(round_size(max));
                sizes
            }
        };

        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sizes.dedup();
        sizes.truncate(n);
        sizes
    }

    /// 한 사이즈를 양 레그로 평가
    async fn probe_size(
        &self,
        anchor: &TokenInfo,
        intermediate: &TokenInfo,
        size_sol: f64,
        anchor_usd: f64,
    ) -> SizeProbe {
        let trading = &self.config.trading;
        let size_raw = to_raw_amount(size_sol, anchor.decimals);

        let leg1 = match self
            .quote
            .quote(anchor, intermediate, size_raw, trading.max_slippage_bps)
            .await
        {
            Ok(q) if q.is_valid() => q,
            Ok(_) => return SizeProbe::failed(size_sol, size_raw, "leg1 zero out"),
            Err(e) => return SizeProbe::failed(size_sol, size_raw, format!("leg1: {}", e)),
        };

        tokio::time::sleep(Duration::from_millis(PROBE_LEG_PAUSE_MS)).await;

        let leg2 = match self
            .quote
            .quote(
                intermediate,
                anchor,
                leg1.out_amount,
                trading.max_slippage_bps,
            )
            .await
        {
            Ok(q) if q.is_valid() => q,
            Ok(_) => return SizeProbe::failed(size_sol, size_raw, "leg2 zero out"),
            Err(e) => return SizeProbe::failed(size_sol, size_raw, format!("leg2: {}", e)),
        };

        let profit_raw = leg2.out_amount as i128 - size_raw as i128;
        let profit_bps = profit_basis_points(profit_raw, size_raw as u128);
        let profit_pct = bps_to_pct(profit_bps);
        let profit_usd = profit_to_usd(profit_raw, anchor.decimals, anchor_usd);
        let total_value_usd = size_sol * anchor_usd;
        let total_impact_pct = (leg1.price_impact_pct + leg2.price_impact_pct) * 100.0;

        let meets_pct = profit_pct >= trading.min_profit_pct;
        let meets_usd = profit_usd >= trading.min_profit_usd;
        let meets_impact = total_impact_pct <= trading.max_price_impact_pct;

        SizeProbe {
            size_sol,
            size_raw,
            leg1: Some(leg1),
            leg2: Some(leg2),
            profit_raw,
            profit_bps,
            profit_pct,
            profit_usd,
            total_value_usd,
            total_impact_pct,
            meets_pct,
            meets_usd,
            meets_impact,
            success: meets_pct && meets_usd && meets_impact,
            failure: None,
        }
    }

    /// 스코어링 - 동일 입력에 대해 결정적
    fn score_probe(&self, probe: &SizeProbe, anchor_usd: f64) -> f64 {
        let trading = &self.config.trading;
        let max_value_usd = trading.max_trade_size_sol * anchor_usd;
        let value_term = if max_value_usd > 0.0 {
            probe.total_value_usd / max_value_usd
        } else {
            0.0
        };
        let impact_term =
            (1.0 - probe.total_impact_pct / trading.max_price_impact_pct).max(0.0);

        W_PROFIT_USD * (probe.profit_usd / trading.min_profit_usd)
            + W_PROFIT_PCT * (probe.profit_pct / trading.min_profit_pct)
            + W_TRADE_VALUE * value_term
            + W_IMPACT * impact_term
    }

    /// 최적 사이즈 탐색
    ///
    /// 프로브는 오름차순으로 순차 실행되고 실패는 기록만 한다.
    /// success 프로브가 없으면 None.
    pub async fn find_optimal(
        &self,
        anchor: &TokenInfo,
        intermediate: &TokenInfo,
        anchor_usd: f64,
    ) -> Option<SizeCandidate> {
        let sizes = self.generate_probe_sizes();
        let probe_delay = self.config.sizing.probe_delay_ms;
        let mut probes: Vec<SizeProbe> = Vec::with_capacity(sizes.len());

        for (i, size) in sizes.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                debug!("사이저 취소 관측 - 프로브 중단");
                break;
            }

            let probe = self
                .probe_size(anchor, intermediate, *size, anchor_usd)
                .await;
            match &probe.failure {
                Some(reason) => debug!("🔎 프로브 {} SOL 실패: {}", size, reason),
                None => debug!(
                    "🔎 프로브 {} SOL: {:.4}% (${:.4}) impact {:.3}% success={}",
                    size, probe.profit_pct, probe.profit_usd, probe.total_impact_pct, probe.success
                ),
            }
            probes.push(probe);

            if i + 1 < sizes.len() && probe_delay > 0 {
                tokio::time::sleep(Duration::from_millis(probe_delay)).await;
            }
        }

        let mut best: Option<SizeCandidate> = None;
        for probe in probes.into_iter().filter(|p| p.success) {
            let score = self.score_probe(&probe, anchor_usd);
            let replace = match &best {
                None => true,
                Some(current) => {
                    score > current.score
                        || (score == current.score
                            && (probe.profit_usd > current.probe.profit_usd
                                || (probe.profit_usd == current.probe.profit_usd
                                    && probe.size_sol > current.probe.size_sol)))
                }
            };
            if replace {
                best = Some(SizeCandidate { probe, score });
            }
        }

        if let Some(candidate) = &best {
            info!(
                "🎯 후보 선택: {} SOL, {:.4}% (${:.4}), score {:.3}",
                candidate.probe.size_sol,
                candidate.probe.profit_pct,
                candidate.probe.profit_usd,
                candidate.score
            );
            self.store
                .record_selection(&intermediate.mint.to_string(), &candidate.probe)
                .await;
        }
        best
    }

    /// 체결 결과를 학습 저장소에 반영
    pub async fn update_actual(
        &self,
        intermediate: &TokenInfo,
        size_sol: f64,
        realized_profit_pct: f64,
        success: bool,
    ) {
        self.store
            .update_actual(
                &intermediate.mint.to_string(),
                size_sol,
                realized_profit_pct,
                success,
            )
            .await;
    }

    pub async fn cleanup_old(&self) {
        self.store.cleanup_old().await;
    }

    pub fn store(&self) -> &PairPerformanceStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::SystemClock;
    use crate::mocks::MockQuoteService;

    fn sizer_with(
        mutate: impl FnOnce(&mut Config),
        quote: Arc<MockQuoteService>,
    ) -> DynamicSizer {
        let mut config = Config::load_test_config();
        mutate(&mut config);
        DynamicSizer::new(
            Arc::new(config),
            quote,
            Arc::new(SystemClock),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn tokens() -> (TokenInfo, TokenInfo) {
        let anchor = TokenInfo::new(solana_sdk::pubkey::Pubkey::new_unique(), "SOL", 9);
        let inter = TokenInfo::new(solana_sdk::pubkey::Pubkey::new_unique(), "USDC", 6);
        (anchor, inter)
    }

    #[test]
    fn test_stepped_sizes_are_even_and_bounded() {
        let sizer = sizer_with(
            |c| c.sizing.strategy = SizeStrategy::Stepped,
            Arc::new(MockQuoteService::lossless(
                solana_sdk::pubkey::Pubkey::new_unique(),
                17_000.0,
            )),
        );
        let sizes = sizer.generate_probe_sizes();
        assert_eq!(sizes.len(), 5);
        assert_eq!(sizes[0], 0.005);
        assert_eq!(sizes[4], 0.1);
        for pair in sizes.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        for size in &sizes {
            assert!(*size >= 0.005 && *size <= 0.1);
        }
    }

    #[test]
    fn test_optimal_sizes_include_endpoints_and_percent_points() {
        let quote = Arc::new(MockQuoteService::lossless(
            solana_sdk::pubkey::Pubkey::new_unique(),
            17_000.0,
        ));
        let sizer = sizer_with(|_| {}, quote);
        let sizes = sizer.generate_probe_sizes();
        // {min} ∪ {min + span·{10,25,50}%} ∪ {max}, 4자리 반올림
        let expected = [0.005, 0.0145, 0.02875, 0.0525, 0.1];
        assert_eq!(sizes.len(), expected.len());
        for (size, want) in sizes.iter().zip(expected) {
            assert!((size - want).abs() < 1e-4, "{} vs {}", size, want);
        }
        assert_eq!(sizes[0], 0.005);
        assert_eq!(sizes[4], 0.1);
    }

    #[test]
    fn test_degenerate_range_collapses_to_single_size() {
        let quote = Arc::new(MockQuoteService::lossless(
            solana_sdk::pubkey::Pubkey::new_unique(),
            17_000.0,
        ));
        let sizer = sizer_with(
            |c| {
                c.trading.min_trade_size_sol = 0.05;
                c.trading.max_trade_size_sol = 0.05;
            },
            quote,
        );
        let sizes = sizer.generate_probe_sizes();
        assert_eq!(sizes, vec![0.05]);
    }

    #[tokio::test]
    async fn test_lossless_round_trip_yields_none() {
        // quote(A,B,x)=k·x, quote(B,A,y)=y/k → 0 수익, 양의 USD 하한에서 None
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::lossless(anchor.mint, 17_000.0));
        let sizer = sizer_with(|_| {}, quote);
        let candidate = sizer.find_optimal(&anchor, &inter, 100.0).await;
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn test_uniform_edge_prefers_largest_value() {
        // 모든 사이즈에서 profit_pct ≈ 100·δ, 가치 항이 큰 사이즈가 이긴다
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.01));
        let sizer = sizer_with(
            |c| {
                c.trading.min_profit_pct = 0.3;
                c.trading.min_profit_usd = 0.01;
            },
            quote,
        );
        let candidate = sizer.find_optimal(&anchor, &inter, 100.0).await.unwrap();
        assert_eq!(candidate.probe.size_sol, 0.1);
        assert!((candidate.probe.profit_pct - 1.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_impact_gate_rejects_probes() {
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.01));
        quote.set_impact_fraction(0.015).await; // 레그당 1.5% → 합산 3% > 2%
        let sizer = sizer_with(
            |c| {
                c.trading.min_profit_usd = 0.01;
            },
            quote,
        );
        assert!(sizer.find_optimal(&anchor, &inter, 100.0).await.is_none());
    }

    #[tokio::test]
    async fn test_usd_floor_rejects_scenario_one() {
        // 0.4% 엣지는 최대 사이즈 0.1에서도 USD 수익이
        // $0.50 하한 미달 → 실행 없음
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.004));
        quote.set_impact_fraction(0.001).await;
        let sizer = sizer_with(|_| {}, quote);
        let candidate = sizer.find_optimal(&anchor, &inter, 100.0).await;
        assert!(candidate.is_none());
    }

    #[tokio::test]
    async fn test_scoring_is_deterministic() {
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.01));
        let sizer = sizer_with(|c| c.trading.min_profit_usd = 0.01, quote);

        let first = sizer.find_optimal(&anchor, &inter, 100.0).await.unwrap();
        let second = sizer.find_optimal(&anchor, &inter, 100.0).await.unwrap();
        assert_eq!(first.probe.size_sol, second.probe.size_sol);
        assert_eq!(first.score, second.score);
    }

    #[tokio::test]
    async fn test_probe_failures_are_recorded_not_fatal() {
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.01));
        // 첫 두 호출(첫 프로브의 양 레그 중 leg1, 두번째 프로브의 leg1) 실패
        quote
            .push_failure(crate::types::QuoteError::Server { status: 500 })
            .await;
        let sizer = sizer_with(|c| c.trading.min_profit_usd = 0.01, quote);
        // 실패 프로브가 있어도 나머지에서 후보가 나온다
        let candidate = sizer.find_optimal(&anchor, &inter, 100.0).await;
        assert!(candidate.is_some());
    }

    #[tokio::test]
    async fn test_selection_feeds_performance_store() {
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.01));
        let sizer = sizer_with(|c| c.trading.min_profit_usd = 0.01, quote);
        sizer.find_optimal(&anchor, &inter, 100.0).await.unwrap();

        let entry = sizer.store().get(&inter.mint.to_string()).await.unwrap();
        assert_eq!(entry.best_size_sol, 0.1);
        assert_eq!(entry.recent_samples.len(), 1);

        sizer.update_actual(&inter, 0.1, -100.0, false).await;
        let entry = sizer.store().get(&inter.mint.to_string()).await.unwrap();
        assert_eq!(entry.total_trades, 1);
        assert_eq!(entry.successful_trades, 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_probing() {
        let (anchor, inter) = tokens();
        let quote = Arc::new(MockQuoteService::with_edge(anchor.mint, 17_000.0, 0.01));
        let cancel = Arc::new(AtomicBool::new(true));
        let sizer = DynamicSizer::new(
            Arc::new(Config::load_test_config()),
            quote.clone(),
            Arc::new(SystemClock),
            cancel,
        );
        assert!(sizer.find_optimal(&anchor, &inter, 100.0).await.is_none());
        assert_eq!(quote.call_count().await, 0);
    }
}
