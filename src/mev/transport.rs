use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::transaction::VersionedTransaction;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::bundle::BundleClient;
use super::protection::{ProtectionLevel, ProtectionParams};
use crate::common::time::Clock;
use crate::config::MevConfig;
use crate::constants::{
    MEV_MONITOR_DELAY_MS, MEV_OBSERVATIONS_MAX, MEV_OBSERVATION_TTL_HOURS,
};
use crate::types::{ExecutionResult, SubmitMethod};

const RPC_SEND_ATTEMPTS: u32 = 3;
const RPC_RETRY_PAUSE_MS: u64 = 500;

/// 제출 후 진단 기록 - 제어 흐름에 영향을 주지 않는다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MEVObservation {
    pub txid: String,
    pub expected_profit_usd: f64,
    pub size_sol: f64,
    pub observed_at: DateTime<Utc>,
}

/// 실행 트랜스포트 seam - 테스트에서는 MockTransport로 교체
#[async_trait]
pub trait ExecutionTransport: Send + Sync {
    /// 서명된 트랜잭션을 제출한다. 경계를 넘어 panic하지 않고 항상 결과를 반환.
    async fn execute(
        &self,
        tx: &VersionedTransaction,
        params: &ProtectionParams,
    ) -> ExecutionResult;

    /// 정산 지연 후 진단 관측 기록 (best-effort)
    async fn monitor_mev(&self, txid: &str, expected_profit_usd: f64, size_sol: f64);

    /// 오래된 관측 제거
    async fn cleanup_old(&self);
}

/// MEV 보호 실행 트랜스포트
///
/// 제출 순서: 지터 슬립 → 번들(활성 시) → 프라이빗 풀(HIGH 한정, 스텁)
/// → 표준 RPC 폴백.
pub struct MevTransport {
    config: MevConfig,
    bundle_client: Option<BundleClient>,
    rpc: Arc<RpcClient>,
    clock: Arc<dyn Clock>,
    observations: RwLock<VecDeque<MEVObservation>>,
}

impl MevTransport {
    pub fn new(config: MevConfig, rpc: Arc<RpcClient>, clock: Arc<dyn Clock>) -> Self {
        let bundle_client = if config.use_bundles {
            Some(BundleClient::new(
                config.block_engine_urls.clone(),
                config.bundle_timeout_ms,
            ))
        } else {
            None
        };
        Self {
            config,
            bundle_client,
            rpc,
            clock,
            observations: RwLock::new(VecDeque::new()),
        }
    }

    /// 프라이빗 멤풀 경로 - 선언만 되어 있고 표준 RPC로 폴스루한다
    async fn submit_private_pool(&self, _tx_base64: &str) -> Result<String> {
        Err(anyhow!("private pool path not implemented"))
    }

    async fn submit_standard_rpc(&self, tx: &VersionedTransaction) -> Result<String> {
        let mut last_error = anyhow!("rpc send not attempted");
        for attempt in 1..=RPC_SEND_ATTEMPTS {
            let send_config = RpcSendTransactionConfig {
                skip_preflight: false,
                max_retries: Some(3),
                ..Default::default()
            };
            match self.rpc.send_transaction_with_config(tx, send_config).await {
                Ok(signature) => return Ok(signature.to_string()),
                Err(e) => {
                    warn!("⚠️ RPC 제출 실패 ({}/{}): {}", attempt, RPC_SEND_ATTEMPTS, e);
                    last_error = anyhow!(e);
                    if attempt < RPC_SEND_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(RPC_RETRY_PAUSE_MS)).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    pub async fn observation_count(&self) -> usize {
        self.observations.read().await.len()
    }

    pub async fn observations(&self) -> Vec<MEVObservation> {
        self.observations.read().await.iter().cloned().collect()
    }
}

#[async_trait]
impl ExecutionTransport for MevTransport {
    async fn execute(
        &self,
        tx: &VersionedTransaction,
        params: &ProtectionParams,
    ) -> ExecutionResult {
        if params.send_delay_ms > 0 {
            debug!("⏳ 제출 지터 {}ms", params.send_delay_ms);
            tokio::time::sleep(Duration::from_millis(params.send_delay_ms)).await;
        }

        let serialized = match bincode::serialize(tx) {
            Ok(bytes) => bytes,
            Err(e) => {
                return ExecutionResult::failed(
                    format!("transaction serialize: {}", e),
                    SubmitMethod::StandardRpc,
                )
            }
        };
        let tx_base64 = BASE64.encode(&serialized);

        let mut last_error = String::new();

        // 1. 우선 번들 제출
        if self.config.use_bundles {
            if let Some(bundle_client) = &self.bundle_client {
                match bundle_client.submit(&tx_base64).await {
                    Ok(bundle_id) => {
                        info!(
                            "📦 번들 제출 성공: {} (tip {:.4} SOL, {})",
                            bundle_id, params.bundle_tip_sol, params.level
                        );
                        return ExecutionResult::ok(bundle_id, SubmitMethod::Bundle);
                    }
                    Err(e) => {
                        warn!("⚠️ 번들 제출 실패 - 폴백 진행: {}", e);
                        last_error = e.to_string();
                    }
                }
            }
        }

        // 2. 프라이빗 풀 (HIGH 보호 수준에서만 시도)
        if self.config.use_private_pool && params.level == ProtectionLevel::High {
            match self.submit_private_pool(&tx_base64).await {
                Ok(txid) => return ExecutionResult::ok(txid, SubmitMethod::PrivatePool),
                Err(e) => {
                    debug!("프라이빗 풀 경로 불가: {}", e);
                    last_error = e.to_string();
                }
            }
        }

        // 3. 표준 RPC 폴백
        match self.submit_standard_rpc(tx).await {
            Ok(txid) => {
                info!("✅ 표준 RPC 제출 성공: {}", txid);
                ExecutionResult::ok(txid, SubmitMethod::StandardRpc)
            }
            Err(e) => {
                let message = if last_error.is_empty() {
                    e.to_string()
                } else {
                    format!("{} (bundle: {})", e, last_error)
                };
                ExecutionResult::failed(message, SubmitMethod::StandardRpc)
            }
        }
    }

    async fn monitor_mev(&self, txid: &str, expected_profit_usd: f64, size_sol: f64) {
        tokio::time::sleep(Duration::from_millis(MEV_MONITOR_DELAY_MS)).await;

        let observation = MEVObservation {
            txid: txid.to_string(),
            expected_profit_usd,
            size_sol,
            observed_at: self.clock.now_wall(),
        };
        let mut observations = self.observations.write().await;
        observations.push_back(observation);
        while observations.len() > MEV_OBSERVATIONS_MAX {
            observations.pop_front();
        }
        debug!("🔍 MEV 관측 기록: {}", txid);
    }

    async fn cleanup_old(&self) {
        let cutoff = self.clock.now_wall() - chrono::Duration::hours(MEV_OBSERVATION_TTL_HOURS);
        let mut observations = self.observations.write().await;
        let before = observations.len();
        observations.retain(|o| o.observed_at > cutoff);
        let removed = before - observations.len();
        if removed > 0 {
            debug!("🧹 MEV 관측 {}건 정리", removed);
        }
    }
}
