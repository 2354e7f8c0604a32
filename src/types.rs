use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// 토큰 정보 - 동등성은 민트 주소 기준
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: Pubkey,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenInfo {
    pub fn new(mint: Pubkey, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            mint,
            symbol: symbol.into(),
            decimals,
        }
    }
}

impl PartialEq for TokenInfo {
    fn eq(&self, other: &Self) -> bool {
        self.mint == other.mint
    }
}

impl Eq for TokenInfo {}

impl fmt::Display for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// 애그리게이터 단일 레그 견적
///
/// `route`는 후속 스왑 트랜잭션 구성에 그대로 전달되는 불투명 라우트 기술자다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub in_amount: u64,
    pub out_amount: u64,
    /// 가격 영향, 분수 표기 (0.001 = 0.1%)
    pub price_impact_pct: f64,
    pub slippage_bps: u16,
    pub route: serde_json::Value,
}

impl Quote {
    pub fn is_valid(&self) -> bool {
        self.out_amount > 0
    }
}

/// 사이즈 프로브 결과 - 한 사이즈에 대한 양 레그 견적과 평가
#[derive(Debug, Clone)]
pub struct SizeProbe {
    pub size_sol: f64,
    pub size_raw: u64,
    pub leg1: Option<Quote>,
    pub leg2: Option<Quote>,
    pub profit_raw: i128,
    pub profit_bps: i64,
    pub profit_pct: f64,
    pub profit_usd: f64,
    pub total_value_usd: f64,
    /// 양 레그 합산 가격 영향, 퍼센트 표기
    pub total_impact_pct: f64,
    pub meets_pct: bool,
    pub meets_usd: bool,
    pub meets_impact: bool,
    pub success: bool,
    pub failure: Option<String>,
}

impl SizeProbe {
    /// 견적 실패 프로브
    pub fn failed(size_sol: f64, size_raw: u64, reason: impl Into<String>) -> Self {
        Self {
            size_sol,
            size_raw,
            leg1: None,
            leg2: None,
            profit_raw: 0,
            profit_bps: 0,
            profit_pct: 0.0,
            profit_usd: 0.0,
            total_value_usd: 0.0,
            total_impact_pct: 0.0,
            meets_pct: false,
            meets_usd: false,
            meets_impact: false,
            success: false,
            failure: Some(reason.into()),
        }
    }
}

/// 선택된 후보 사이즈
#[derive(Debug, Clone)]
pub struct SizeCandidate {
    pub probe: SizeProbe,
    pub score: f64,
}

/// 트랜잭션 제출 경로
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmitMethod {
    Bundle,
    PrivatePool,
    StandardRpc,
    Simulation,
}

impl fmt::Display for SubmitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitMethod::Bundle => write!(f, "bundle"),
            SubmitMethod::PrivatePool => write!(f, "private_pool"),
            SubmitMethod::StandardRpc => write!(f, "standard_rpc"),
            SubmitMethod::Simulation => write!(f, "simulation"),
        }
    }
}

/// 트랜스포트 실행 결과 - 경계를 넘어 panic하지 않고 항상 값으로 반환
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub txid: Option<String>,
    pub error: Option<String>,
    pub method: SubmitMethod,
}

impl ExecutionResult {
    pub fn ok(txid: impl Into<String>, method: SubmitMethod) -> Self {
        Self {
            success: true,
            txid: Some(txid.into()),
            error: None,
            method,
        }
    }

    pub fn failed(error: impl Into<String>, method: SubmitMethod) -> Self {
        Self {
            success: false,
            txid: None,
            error: Some(error.into()),
            method,
        }
    }
}

/// 틱 스킵 사유
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    BusyExecuting,
    BelowUsdFloor,
    PriceUnavailable,
    RevertRequested,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BusyExecuting => write!(f, "busy_executing"),
            SkipReason::BelowUsdFloor => write!(f, "below_usd_floor"),
            SkipReason::PriceUnavailable => write!(f, "price_unavailable"),
            SkipReason::RevertRequested => write!(f, "revert_requested"),
        }
    }
}

/// 실패 분류
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureKind {
    Quote,
    Execution,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Quote => write!(f, "quote"),
            FailureKind::Execution => write!(f, "execution"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}

/// 한 틱의 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IterationOutcome {
    NoProfitable,
    Executed {
        profit_pct: f64,
        profit_usd: f64,
        txids: Vec<String>,
        method: SubmitMethod,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl IterationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            IterationOutcome::NoProfitable => "no_profitable",
            IterationOutcome::Executed { .. } => "executed",
            IterationOutcome::Failed { .. } => "failed",
            IterationOutcome::Skipped { .. } => "skipped",
        }
    }
}

/// 틱 기록
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub id: String,
    pub index: u64,
    pub started_at: DateTime<Utc>,
    pub route: String,
    pub picked_size_sol: Option<f64>,
    pub outcome: IterationOutcome,
}

impl IterationRecord {
    pub fn new(
        index: u64,
        started_at: DateTime<Utc>,
        route: impl Into<String>,
        picked_size_sol: Option<f64>,
        outcome: IterationOutcome,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            index,
            started_at,
            route: route.into(),
            picked_size_sol,
            outcome,
        }
    }
}

/// 페어별 축약 샘플 (학습 저장소용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSample {
    pub timestamp: DateTime<Utc>,
    pub size_sol: f64,
    pub profit_pct: f64,
    pub profit_usd: f64,
    /// 실제 체결 결과에서 온 샘플인지 (프로브 추정이 아닌)
    pub actual: bool,
    pub success: bool,
}

/// 견적 클라이언트 에러 분류
///
/// 재시도/서킷 정책이 variant 단위로 분기하므로 anyhow가 아닌 타입 에러를 쓴다.
#[derive(thiserror::Error, Debug, Clone)]
pub enum QuoteError {
    #[error("rate limited by aggregator")]
    RateLimited,

    #[error("circuit breaker open")]
    CircuitOpen,

    #[error("request queued longer than {0}s")]
    QueueTimeout(u64),

    #[error("invalid quote: {0}")]
    Invalid(String),

    #[error("client error: status {status}")]
    Client { status: u16 },

    #[error("server error: status {status}")]
    Server { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("cancelled")]
    Cancelled,
}

impl QuoteError {
    /// 서킷 브레이커의 연속 실패 카운터에 포함되는 에러인지
    ///
    /// 큐 타임아웃/취소는 I/O 없이 클라이언트 안에서 끝난 것이므로 제외.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(
            self,
            QuoteError::CircuitOpen | QuoteError::Cancelled | QuoteError::QueueTimeout(_)
        )
    }
}
