use std::collections::VecDeque;

use async_trait::async_trait;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::Mutex;

use crate::quote::QuoteService;
use crate::types::{Quote, QuoteError, TokenInfo};

/// 기록된 견적 호출
#[derive(Debug, Clone)]
pub struct MockQuoteCall {
    pub input: Pubkey,
    pub output: Pubkey,
    pub amount: u64,
}

struct MockQuoteState {
    forward_rate: f64,
    reverse_rate: f64,
    impact_fraction: f64,
    queued_failures: VecDeque<QuoteError>,
    fail_all: Option<QuoteError>,
    calls: Vec<MockQuoteCall>,
}

/// 스크립트 가능한 견적 서비스
///
/// 앵커가 입력이면 forward, 아니면 reverse 환율을 적용한다.
/// `lossless(k)`는 forward k / reverse 1/k (라운드트립 0 수익),
/// `with_edge(k, δ)`는 reverse (1+δ)/k (라운드트립 수익 100·δ %).
pub struct MockQuoteService {
    anchor_mint: Pubkey,
    state: Mutex<MockQuoteState>,
}

impl MockQuoteService {
    pub fn lossless(anchor_mint: Pubkey, k: f64) -> Self {
        Self::new(anchor_mint, k, 1.0 / k)
    }

    pub fn with_edge(anchor_mint: Pubkey, k: f64, delta: f64) -> Self {
        Self::new(anchor_mint, k, (1.0 + delta) / k)
    }

    pub fn new(anchor_mint: Pubkey, forward_rate: f64, reverse_rate: f64) -> Self {
        Self {
            anchor_mint,
            state: Mutex::new(MockQuoteState {
                forward_rate,
                reverse_rate,
                impact_fraction: 0.0,
                queued_failures: VecDeque::new(),
                fail_all: None,
                calls: Vec::new(),
            }),
        }
    }

    /// 레그당 가격 영향(분수) 설정
    pub async fn set_impact_fraction(&self, fraction: f64) {
        self.state.lock().await.impact_fraction = fraction;
    }

    /// 다음 호출 하나를 실패시킨다 (선입선출)
    pub async fn push_failure(&self, error: QuoteError) {
        self.state.lock().await.queued_failures.push_back(error);
    }

    /// 모든 호출을 실패시킨다
    pub async fn set_fail_all(&self, error: Option<QuoteError>) {
        self.state.lock().await.fail_all = error;
    }

    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    pub async fn calls(&self) -> Vec<MockQuoteCall> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl QuoteService for MockQuoteService {
    async fn quote(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        amount_raw: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError> {
        let mut state = self.state.lock().await;
        state.calls.push(MockQuoteCall {
            input: input.mint,
            output: output.mint,
            amount: amount_raw,
        });

        if let Some(error) = state.queued_failures.pop_front() {
            return Err(error);
        }
        if let Some(error) = &state.fail_all {
            return Err(error.clone());
        }

        let rate = if input.mint == self.anchor_mint {
            state.forward_rate
        } else {
            state.reverse_rate
        };
        let out_amount = (amount_raw as f64 * rate).round() as u64;

        Ok(Quote {
            input_mint: input.mint,
            output_mint: output.mint,
            in_amount: amount_raw,
            out_amount,
            price_impact_pct: state.impact_fraction,
            slippage_bps,
            route: json!({
                "mock": true,
                "inAmount": amount_raw.to_string(),
                "outAmount": out_amount.to_string(),
            }),
        })
    }
}
