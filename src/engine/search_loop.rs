use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::rotation::TokenRotator;
use super::single_flight::FlightGuard;
use super::stats::EngineStats;
use crate::common::math::{bps_to_pct, profit_basis_points, profit_to_usd};
use crate::common::time::Clock;
use crate::config::Config;
use crate::constants::{
    INTER_LEG_SETTLE_MS, MEMORY_RECLAIM_EVERY, SHUTDOWN_GRACE_MS, STORE_CLEANUP_EVERY,
};
use crate::exchange::{SwapTransactionBuilder, TokenDirectory};
use crate::logging;
use crate::mev::{ExecutionTransport, ProtectionParams, ProtectionLevel};
use crate::oracle::SolPriceOracle;
use crate::sizer::DynamicSizer;
use crate::types::{
    FailureKind, IterationOutcome, IterationRecord, SizeCandidate, SkipReason, SubmitMethod,
    TokenInfo,
};

/// 탐색 루프 엔진
///
/// 한 번에 틱 하나, 프로세스 전체에 실행 하나(single-flight)를 보장한다.
/// 틱 내부의 모든 에러는 틱 경계에서 IterationRecord로 변환되고 루프는
/// 계속된다.
pub struct SearchEngine {
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
    oracle: Arc<SolPriceOracle>,
    sizer: Arc<DynamicSizer>,
    transport: Arc<dyn ExecutionTransport>,
    swap_builder: Arc<dyn SwapTransactionBuilder>,
    tokens: Arc<dyn TokenDirectory>,
    rotator: Arc<Mutex<TokenRotator>>,
    stats: Arc<RwLock<EngineStats>>,
    swap_in_flight: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    manual_rotation: AtomicBool,
    force_execute: AtomicBool,
    revert_requested: AtomicBool,
    iteration: AtomicU64,
    /// 외부 메모리 매니저 회수 훅 (주기 호출)
    reclaim_hook: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl SearchEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        clock: Arc<dyn Clock>,
        oracle: Arc<SolPriceOracle>,
        sizer: Arc<DynamicSizer>,
        transport: Arc<dyn ExecutionTransport>,
        swap_builder: Arc<dyn SwapTransactionBuilder>,
        tokens: Arc<dyn TokenDirectory>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let ring = tokens.intermediates().to_vec();
        Self {
            config,
            clock,
            oracle,
            sizer,
            transport,
            swap_builder,
            tokens,
            rotator: Arc::new(Mutex::new(TokenRotator::new(ring))),
            stats: Arc::new(RwLock::new(EngineStats::new())),
            swap_in_flight: Arc::new(AtomicBool::new(false)),
            cancel,
            manual_rotation: AtomicBool::new(false),
            force_execute: AtomicBool::new(false),
            revert_requested: AtomicBool::new(false),
            iteration: AtomicU64::new(0),
            reclaim_hook: None,
        }
    }

    pub fn with_reclaim_hook(mut self, hook: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.reclaim_hook = Some(hook);
        self
    }

    // ---- 제어 플레인 원샷 플래그 ----

    pub fn request_manual_rotation(&self) {
        self.manual_rotation.store(true, Ordering::SeqCst);
    }

    pub fn request_force_execute(&self) {
        self.force_execute.store(true, Ordering::SeqCst);
    }

    pub fn request_revert(&self) {
        self.revert_requested.store(true, Ordering::SeqCst);
    }

    pub fn signal_shutdown(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_executing(&self) -> bool {
        self.swap_in_flight.load(Ordering::SeqCst)
    }

    pub async fn stats_snapshot(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// 메인 루프 - 취소 신호까지 주기 틱을 돈다
    pub async fn run(self: Arc<Self>) -> Result<()> {
        info!("🚀 탐색 루프 시작 (주기 {}ms)", self.config.engine.iteration_interval_ms);

        let rotation_task = self.spawn_rotation_task();

        let mut ticker = tokio::time::interval(Duration::from_millis(
            self.config.engine.iteration_interval_ms,
        ));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.cancel.load(Ordering::SeqCst) {
                info!("🛑 취소 신호 관측 - 루프 종료");
                break;
            }
            let record = self.run_iteration().await;
            self.record_iteration(record).await;
        }

        // 종료 유예 - 비행 중 실행이 끝나기를 기다린다
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(SHUTDOWN_GRACE_MS);
        while self.swap_in_flight.load(Ordering::SeqCst)
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if self.swap_in_flight.load(Ordering::SeqCst) {
            warn!("⚠️ 종료 유예 내에 실행이 끝나지 않음 - 플래그 강제 해제");
            self.swap_in_flight.store(false, Ordering::SeqCst);
        }

        rotation_task.abort();

        let stats = self.stats.read().await;
        logging::performance(&format!("최종 카운터 플러시: {}", stats.summary()));
        Ok(())
    }

    /// 주기 로테이션 태스크 - 틱과 같은 뮤텍스로 직렬화된다
    fn spawn_rotation_task(self: &Arc<Self>) -> JoinHandle<()> {
        let rotator = Arc::clone(&self.rotator);
        let cancel = Arc::clone(&self.cancel);
        let interval_ms = self.config.engine.rotation_interval_ms;
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(interval_ms));
            // 첫 즉시 틱 소비 - 기동 직후 로테이션 방지
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                rotator.lock().await.advance();
            }
        })
    }

    /// 한 틱 수행 - 내부 에러는 Failed 기록으로 흡수
    pub async fn run_iteration(&self) -> IterationRecord {
        let index = self.iteration.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = self.clock.now_wall();

        // 로테이터 잠금을 틱 동안 유지해 틱 중 B 변경을 막는다
        let mut rotator = self.rotator.lock().await;
        if self.manual_rotation.swap(false, Ordering::SeqCst) {
            rotator.advance();
        }
        let anchor = self.tokens.anchor().clone();
        let intermediate = rotator.current().clone();
        let route = format!(
            "{} -> {} -> {}",
            anchor.symbol, intermediate.symbol, anchor.symbol
        );

        if self.revert_requested.swap(false, Ordering::SeqCst) {
            logging::arbitrage_warn("리버트 요청 소비 - 이번 틱은 건너뜀");
            return IterationRecord::new(
                index,
                started_at,
                route,
                None,
                IterationOutcome::Skipped {
                    reason: SkipReason::RevertRequested,
                },
            );
        }

        let (picked, outcome) = match self.scan_and_execute(&anchor, &intermediate).await {
            Ok(v) => v,
            Err(e) => {
                warn!("❌ 틱 내부 에러 (경계에서 흡수): {:#}", e);
                (
                    None,
                    IterationOutcome::Failed {
                        kind: FailureKind::Internal,
                        message: e.to_string(),
                    },
                )
            }
        };
        drop(rotator);

        IterationRecord::new(index, started_at, route, picked, outcome)
    }

    /// Scanning → (NoOp | Executing) 단계
    async fn scan_and_execute(
        &self,
        anchor: &TokenInfo,
        intermediate: &TokenInfo,
    ) -> Result<(Option<f64>, IterationOutcome)> {
        // 틱당 한 번 캡처된 앵커 가격으로 사이징과 로깅을 수행한다
        let anchor_usd = match self.oracle.current_usd().await {
            Some(price) => price,
            None => {
                return Ok((
                    None,
                    IterationOutcome::Skipped {
                        reason: SkipReason::PriceUnavailable,
                    },
                ))
            }
        };

        let candidate = match self
            .sizer
            .find_optimal(anchor, intermediate, anchor_usd)
            .await
        {
            Some(c) => c,
            None => return Ok((None, IterationOutcome::NoProfitable)),
        };
        let size = candidate.probe.size_sol;

        // USD 하한 재확인 (사이저 게이트의 방어적 이중 체크)
        let forced = self.force_execute.swap(false, Ordering::SeqCst);
        if !forced && candidate.probe.profit_usd < self.config.trading.min_profit_usd {
            logging::arbitrage_warn(&format!(
                "USD 하한 미달 재확인: ${:.4} < ${:.2}",
                candidate.probe.profit_usd, self.config.trading.min_profit_usd
            ));
            return Ok((
                Some(size),
                IterationOutcome::Skipped {
                    reason: SkipReason::BelowUsdFloor,
                },
            ));
        }

        let guard = match FlightGuard::try_acquire(&self.swap_in_flight) {
            Some(g) => g,
            None => {
                logging::arbitrage_warn("이미 실행 중 - 이번 후보는 건너뜀");
                return Ok((
                    Some(size),
                    IterationOutcome::Skipped {
                        reason: SkipReason::BusyExecuting,
                    },
                ));
            }
        };

        let outcome = self
            .execute_candidate(anchor, intermediate, &candidate, anchor_usd)
            .await;
        // 가드는 여기서 명시적으로 해제되지만, 위 호출이 어떤 경로로
        // 끝나든 Drop이 해제를 보장한다
        drop(guard);
        Ok((Some(size), outcome))
    }

    /// Executing 단계 - 모든 실패를 IterationOutcome으로 변환
    async fn execute_candidate(
        &self,
        anchor: &TokenInfo,
        intermediate: &TokenInfo,
        candidate: &SizeCandidate,
        anchor_usd: f64,
    ) -> IterationOutcome {
        let probe = &candidate.probe;

        if !self.config.trading.enabled {
            let txid = format!(
                "simulation_{}",
                self.clock.now_wall().timestamp_millis()
            );
            logging::trade(&format!(
                "🧪 시뮬레이션 체결: {} SOL, {:.4}% (${:.4}) txid={}",
                probe.size_sol, probe.profit_pct, probe.profit_usd, txid
            ));
            self.sizer
                .update_actual(intermediate, probe.size_sol, probe.profit_pct, true)
                .await;
            return IterationOutcome::Executed {
                profit_pct: probe.profit_pct,
                profit_usd: probe.profit_usd,
                txids: vec![txid],
                method: SubmitMethod::Simulation,
            };
        }

        let (leg1_quote, leg2_quote) = match (&probe.leg1, &probe.leg2) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return IterationOutcome::Failed {
                    kind: FailureKind::Internal,
                    message: "candidate missing leg quotes".to_string(),
                }
            }
        };

        // 보호 파라미터는 실행당 한 번 산출된다
        let params = if self.config.mev.enabled {
            ProtectionParams::derive(
                probe.size_sol,
                probe.profit_pct,
                probe.profit_usd,
                &self.config.mev,
                self.config.trading.max_trade_size_sol,
            )
        } else {
            ProtectionParams {
                priority_fee_lamports: self.config.mev.base_priority_fee_lamports,
                send_delay_ms: 0,
                bundle_tip_sol: 0.0,
                level: ProtectionLevel::Low,
            }
        };
        debug!(
            "🛡️ 보호 파라미터: priority={} jitter={}ms tip={:.4} level={}",
            params.priority_fee_lamports,
            params.send_delay_ms,
            params.bundle_tip_sol,
            params.level
        );

        // 레그 1
        let tx1 = match self
            .swap_builder
            .build_signed(&leg1_quote.route, Some(params.priority_fee_lamports))
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                return self
                    .record_leg_failure(intermediate, probe.size_sol, "leg1 build", &e.to_string())
                    .await
            }
        };
        let result1 = self.transport.execute(&tx1, &params).await;
        if !result1.success {
            let message = result1.error.unwrap_or_else(|| "unknown".to_string());
            return self
                .record_leg_failure(intermediate, probe.size_sol, "leg1 send", &message)
                .await;
        }

        tokio::time::sleep(Duration::from_millis(INTER_LEG_SETTLE_MS)).await;

        // 레그 2 - 레그 1의 실제 출력량이 인코딩된 라우트 기술자를 사용
        let tx2 = match self
            .swap_builder
            .build_signed(&leg2_quote.route, Some(params.priority_fee_lamports))
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                return self
                    .record_leg_failure(intermediate, probe.size_sol, "leg2 build", &e.to_string())
                    .await
            }
        };
        let result2 = self.transport.execute(&tx2, &params).await;
        if !result2.success {
            let message = result2.error.unwrap_or_else(|| "unknown".to_string());
            return self
                .record_leg_failure(intermediate, probe.size_sol, "leg2 send", &message)
                .await;
        }

        // 실현 USD 계산 전 신선한 앵커 가격을 다시 읽는다
        if !self.oracle.is_fresh().await {
            self.oracle.force_refresh().await;
        }
        let fresh_usd = self.oracle.current_usd().await.unwrap_or(anchor_usd);

        let realized_out = leg2_quote.out_amount;
        let realized_profit_raw = realized_out as i128 - probe.size_raw as i128;
        let realized_bps = profit_basis_points(realized_profit_raw, probe.size_raw as u128);
        let realized_pct = bps_to_pct(realized_bps);
        let realized_usd = profit_to_usd(realized_profit_raw, anchor.decimals, fresh_usd);

        self.sizer
            .update_actual(intermediate, probe.size_sol, realized_pct, true)
            .await;

        let txids: Vec<String> = [result1.txid.clone(), result2.txid.clone()]
            .into_iter()
            .flatten()
            .collect();

        logging::trade(&format!(
            "💰 체결 완료: {} -> {} -> {} | {:.4}% (${:.4}) | {} | txids: {}",
            anchor.symbol,
            intermediate.symbol,
            anchor.symbol,
            realized_pct,
            realized_usd,
            result2.method,
            txids.join(", ")
        ));

        // 제출 후 진단 관측 - 제어 흐름에 영향 없음
        if let Some(txid) = &result2.txid {
            self.transport
                .monitor_mev(txid, realized_usd, probe.size_sol)
                .await;
        }

        IterationOutcome::Executed {
            profit_pct: realized_pct,
            profit_usd: realized_usd,
            txids,
            method: result2.method,
        }
    }

    /// 레그 실패 처리 - 실현 -100%로 기록하고 사이저에 부정 샘플 전달
    async fn record_leg_failure(
        &self,
        intermediate: &TokenInfo,
        size_sol: f64,
        stage: &str,
        message: &str,
    ) -> IterationOutcome {
        logging::arbitrage_warn(&format!("❌ 실행 실패 ({}): {}", stage, message));
        self.sizer
            .update_actual(intermediate, size_sol, -100.0, false)
            .await;
        IterationOutcome::Failed {
            kind: FailureKind::Execution,
            message: format!("{}: {}", stage, message),
        }
    }

    /// Bookkeeping 단계
    pub async fn record_iteration(&self, record: IterationRecord) {
        {
            let mut stats = self.stats.write().await;
            stats.apply(&record);
        }

        // 틱당 단일 info 요약
        let outcome_text = match &record.outcome {
            IterationOutcome::NoProfitable => "수익 후보 없음".to_string(),
            IterationOutcome::Executed {
                profit_pct,
                profit_usd,
                method,
                ..
            } => format!("체결 {:.4}% (${:.4}) via {}", profit_pct, profit_usd, method),
            IterationOutcome::Failed { kind, message } => {
                format!("실패 [{}] {}", kind, message)
            }
            IterationOutcome::Skipped { reason } => format!("스킵 ({})", reason),
        };
        logging::arbitrage(&format!(
            "#{} {} | {}",
            record.index, record.route, outcome_text
        ));

        if record.index % MEMORY_RECLAIM_EVERY == 0 {
            debug!("♻️ 메모리 회수 요청 (iteration {})", record.index);
            if let Some(hook) = &self.reclaim_hook {
                hook();
            }
        }
        if record.index % STORE_CLEANUP_EVERY == 0 {
            self.sizer.cleanup_old().await;
            self.transport.cleanup_old().await;
        }
    }
}
