use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::price_oracle::{within_plausibility_band, PricePoint, PriceSource, PriceTrend};
use crate::common::time::Clock;
use crate::constants::PRICE_HISTORY_MAX;

/// 추세 판정 윈도우 크기와 변동성 윈도우 크기
const TREND_WINDOW: usize = 10;
/// 추세 판정 경계 (±2%)
const TREND_THRESHOLD_PCT: f64 = 2.0;

struct OracleState {
    current: Option<PricePoint>,
    history: VecDeque<PricePoint>,
    last_update: Option<tokio::time::Instant>,
}

/// SOL/USD 가격 오라클
///
/// 등록된 소스를 병렬로 폴링해 성공분의 산술 평균(소수 2자리 반올림)을
/// 유지한다. 평균이 타당성 범위를 벗어나면 직전 가격을 유지한다.
pub struct SolPriceOracle {
    sources: Vec<Arc<dyn PriceSource>>,
    clock: Arc<dyn Clock>,
    refresh_interval: Duration,
    state: RwLock<OracleState>,
}

impl SolPriceOracle {
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        clock: Arc<dyn Clock>,
        refresh_interval_ms: u64,
    ) -> Self {
        Self {
            sources,
            clock,
            refresh_interval: Duration::from_millis(refresh_interval_ms),
            state: RwLock::new(OracleState {
                current: None,
                history: VecDeque::with_capacity(PRICE_HISTORY_MAX),
                last_update: None,
            }),
        }
    }

    /// 모든 소스를 병렬 조회해 가격을 갱신
    ///
    /// 최소 한 소스가 응답해야 성공. 반환값은 갱신 성공 여부.
    pub async fn refresh(&self) -> bool {
        let active: Vec<&Arc<dyn PriceSource>> =
            self.sources.iter().filter(|s| s.available()).collect();
        if active.is_empty() {
            warn!("⚠️ 사용 가능한 가격 소스가 없습니다");
            return false;
        }

        let fetches = active.iter().map(|source| {
            let source = Arc::clone(source);
            async move { (source.name(), source.fetch_usd().await) }
        });
        let results = futures::future::join_all(fetches).await;

        let mut prices: Vec<(String, f64)> = Vec::new();
        for (name, price) in results {
            match price {
                Some(p) => prices.push((name.to_string(), p)),
                None => debug!("가격 소스 {} 응답 없음", name),
            }
        }

        if prices.is_empty() {
            warn!("⚠️ 모든 가격 소스 조회 실패 - 직전 가격 유지");
            return false;
        }

        let sum: Decimal = prices
            .iter()
            .filter_map(|(_, p)| Decimal::from_f64_retain(*p))
            .sum();
        let mean = (sum / Decimal::from(prices.len() as u64)).round_dp(2);
        let mean_f64 = mean.to_f64().unwrap_or_default();

        if !within_plausibility_band(mean_f64) {
            warn!(
                "⚠️ 집계 가격 ${} 가 타당성 범위를 벗어남 - 직전 가격 유지",
                mean
            );
            return false;
        }

        let point = PricePoint {
            timestamp: self.clock.now_wall(),
            price_usd: mean,
            sources: prices.into_iter().map(|(n, _)| n).collect(),
        };

        let mut state = self.state.write().await;
        state.history.push_back(point.clone());
        while state.history.len() > PRICE_HISTORY_MAX {
            state.history.pop_front();
        }
        state.current = Some(point);
        state.last_update = Some(tokio::time::Instant::now());
        debug!("💲 SOL/USD 갱신: ${}", mean);
        true
    }

    /// 실행 전 재보정용 강제 갱신
    pub async fn force_refresh(&self) -> bool {
        self.refresh().await
    }

    pub async fn current(&self) -> Option<PricePoint> {
        self.state.read().await.current.clone()
    }

    pub async fn current_usd(&self) -> Option<f64> {
        self.state
            .read()
            .await
            .current
            .as_ref()
            .and_then(|p| p.price_usd.to_f64())
    }

    /// 샘플 신선도 - 마지막 갱신이 2×주기 이내인지
    pub async fn is_fresh(&self) -> bool {
        match self.state.read().await.last_update {
            Some(at) => at.elapsed() < self.refresh_interval * 2,
            None => false,
        }
    }

    /// 최근 10개 샘플의 변동계수
    pub async fn volatility(&self) -> f64 {
        let state = self.state.read().await;
        let window: Vec<f64> = state
            .history
            .iter()
            .rev()
            .take(TREND_WINDOW)
            .filter_map(|p| p.price_usd.to_f64())
            .collect();
        if window.len() < 2 {
            return 0.0;
        }
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        if mean == 0.0 {
            return 0.0;
        }
        let variance =
            window.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / window.len() as f64;
        variance.sqrt() / mean
    }

    /// 최근 윈도우의 첫/끝 변화율 기반 추세
    pub async fn trend(&self) -> PriceTrend {
        let state = self.state.read().await;
        let window: Vec<f64> = state
            .history
            .iter()
            .rev()
            .take(TREND_WINDOW)
            .filter_map(|p| p.price_usd.to_f64())
            .collect();
        if window.len() < 2 {
            return PriceTrend::Stable;
        }
        // window는 최신 → 과거 순서
        let newest = window[0];
        let oldest = window[window.len() - 1];
        if oldest == 0.0 {
            return PriceTrend::Stable;
        }
        let change_pct = (newest - oldest) / oldest * 100.0;
        if change_pct > TREND_THRESHOLD_PCT {
            PriceTrend::Rising
        } else if change_pct < -TREND_THRESHOLD_PCT {
            PriceTrend::Falling
        } else {
            PriceTrend::Stable
        }
    }

    pub async fn history_len(&self) -> usize {
        self.state.read().await.history.len()
    }

    /// 백그라운드 자동 갱신 태스크
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        cancel: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let oracle = Arc::clone(self);
        let interval_ms = self.refresh_interval.as_millis() as u64;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if cancel.load(Ordering::SeqCst) {
                    info!("🛑 가격 갱신 태스크 종료");
                    break;
                }
                oracle.refresh().await;
            }
        })
    }
}
