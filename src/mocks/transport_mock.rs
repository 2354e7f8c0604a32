use std::collections::VecDeque;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_sdk::transaction::VersionedTransaction;
use tokio::sync::Mutex;

use crate::exchange::SwapTransactionBuilder;
use crate::mev::{ExecutionTransport, ProtectionParams};
use crate::types::{ExecutionResult, SubmitMethod};

struct MockTransportState {
    scripted: VecDeque<ExecutionResult>,
    executions: Vec<ProtectionParams>,
    monitored: Vec<String>,
    cleanup_calls: usize,
    sequence: u64,
}

/// 스크립트 가능한 실행 트랜스포트
///
/// 스크립트된 결과가 없으면 성공을 돌려준다. 정산 슬립은 생략한다.
pub struct MockTransport {
    state: Mutex<MockTransportState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockTransportState {
                scripted: VecDeque::new(),
                executions: Vec::new(),
                monitored: Vec::new(),
                cleanup_calls: 0,
                sequence: 0,
            }),
        }
    }

    /// 다음 execute 호출의 결과를 예약 (선입선출)
    pub async fn push_result(&self, result: ExecutionResult) {
        self.state.lock().await.scripted.push_back(result);
    }

    pub async fn execution_count(&self) -> usize {
        self.state.lock().await.executions.len()
    }

    pub async fn executions(&self) -> Vec<ProtectionParams> {
        self.state.lock().await.executions.clone()
    }

    pub async fn monitored(&self) -> Vec<String> {
        self.state.lock().await.monitored.clone()
    }

    pub async fn cleanup_calls(&self) -> usize {
        self.state.lock().await.cleanup_calls
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionTransport for MockTransport {
    async fn execute(
        &self,
        _tx: &VersionedTransaction,
        params: &ProtectionParams,
    ) -> ExecutionResult {
        let mut state = self.state.lock().await;
        state.executions.push(params.clone());
        if let Some(result) = state.scripted.pop_front() {
            return result;
        }
        state.sequence += 1;
        ExecutionResult::ok(
            format!("mock_tx_{}", state.sequence),
            SubmitMethod::StandardRpc,
        )
    }

    async fn monitor_mev(&self, txid: &str, _expected_profit_usd: f64, _size_sol: f64) {
        self.state.lock().await.monitored.push(txid.to_string());
    }

    async fn cleanup_old(&self) {
        self.state.lock().await.cleanup_calls += 1;
    }
}

/// 스크립트 가능한 스왑 트랜잭션 빌더
pub struct MockSwapBuilder {
    fail: Mutex<bool>,
    builds: Mutex<usize>,
}

impl MockSwapBuilder {
    pub fn new() -> Self {
        Self {
            fail: Mutex::new(false),
            builds: Mutex::new(0),
        }
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }

    pub async fn build_count(&self) -> usize {
        *self.builds.lock().await
    }
}

impl Default for MockSwapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapTransactionBuilder for MockSwapBuilder {
    async fn build_signed(
        &self,
        _route: &serde_json::Value,
        _priority_fee_lamports: Option<u64>,
    ) -> Result<VersionedTransaction> {
        *self.builds.lock().await += 1;
        if *self.fail.lock().await {
            return Err(anyhow!("mock swap build failure"));
        }
        Ok(VersionedTransaction::default())
    }
}
