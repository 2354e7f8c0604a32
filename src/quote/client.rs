use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::circuit_breaker::CircuitBreaker;
use super::rate_limiter::RateLimiter;
use crate::config::QuoteConfig;
use crate::constants::QUOTE_ATTEMPT_TIMEOUT_SECS;
use crate::types::{Quote, QuoteError, TokenInfo};

/// 에러 분류별 백오프 (초). 인덱스 = 재시도 횟수, 소진 시 실패 확정.
const RATE_LIMIT_BACKOFF_SECS: [u64; 3] = [5, 10, 20];
const TRANSIENT_BACKOFF_SECS: [u64; 3] = [3, 6, 9];
const SERVER_BACKOFF_SECS: [u64; 3] = [4, 8, 12];

/// 단일 레그 견적 서비스
#[async_trait]
pub trait QuoteService: Send + Sync {
    async fn quote(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        amount_raw: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError>;
}

/// Jupiter v6 스타일 견적 클라이언트
pub struct JupiterQuoteClient {
    http: Client,
    base_url: String,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    cancel: Arc<AtomicBool>,
}

impl JupiterQuoteClient {
    pub fn new(config: &QuoteConfig, cancel: Arc<AtomicBool>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(QUOTE_ATTEMPT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.base_url.clone(),
            limiter: RateLimiter::new(config.min_interval_ms, config.max_per_minute),
            breaker: CircuitBreaker::new(config.circuit_threshold, config.circuit_timeout_ms),
            cancel,
        }
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// 단일 HTTP 시도 - 상태 코드를 에러 분류로 변환
    async fn attempt(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        amount_raw: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError> {
        let url = format!("{}/quote", self.base_url);
        let input_mint = input.mint.to_string();
        let output_mint = output.mint.to_string();
        let amount = amount_raw.to_string();
        let slippage = slippage_bps.to_string();
        let query = [
            ("inputMint", input_mint.as_str()),
            ("outputMint", output_mint.as_str()),
            ("amount", amount.as_str()),
            ("slippageBps", slippage.as_str()),
            ("onlyDirectRoutes", "false"),
        ];

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(QuoteError::RateLimited);
        }
        if status.is_server_error() {
            return Err(QuoteError::Server {
                status: status.as_u16(),
            });
        }
        if status.is_client_error() {
            return Err(QuoteError::Client {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| QuoteError::Invalid(format!("body parse: {}", e)))?;
        parse_quote_body(body, input, output, amount_raw, slippage_bps)
    }
}

/// 견적 응답 파싱 - outAmount가 0이거나 필드가 빠지면 QuoteInvalid
fn parse_quote_body(
    body: serde_json::Value,
    input: &TokenInfo,
    output: &TokenInfo,
    amount_raw: u64,
    slippage_bps: u16,
) -> Result<Quote, QuoteError> {
    let out_amount: u64 = body
        .get("outAmount")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| QuoteError::Invalid("missing outAmount".to_string()))?;
    if out_amount == 0 {
        return Err(QuoteError::Invalid("zero outAmount".to_string()));
    }

    let in_amount: u64 = body
        .get("inAmount")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(amount_raw);

    let price_impact_pct: f64 = match body.get("priceImpactPct") {
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0.0),
        Some(v) => v.as_f64().unwrap_or(0.0),
        None => 0.0,
    };

    Ok(Quote {
        input_mint: input.mint,
        output_mint: output.mint,
        in_amount,
        out_amount,
        price_impact_pct,
        slippage_bps,
        route: body,
    })
}

fn classify_reqwest_error(e: reqwest::Error) -> QuoteError {
    if let Some(status) = e.status() {
        if status.as_u16() == 429 {
            return QuoteError::RateLimited;
        }
        if status.is_server_error() {
            return QuoteError::Server {
                status: status.as_u16(),
            };
        }
        return QuoteError::Client {
            status: status.as_u16(),
        };
    }
    QuoteError::Network(e.to_string())
}

#[async_trait]
impl QuoteService for JupiterQuoteClient {
    async fn quote(
        &self,
        input: &TokenInfo,
        output: &TokenInfo,
        amount_raw: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError> {
        // 서킷이 열려 있으면 I/O 없이 즉시 실패
        self.breaker.check().await?;
        self.limiter.acquire().await?;

        let mut retries: usize = 0;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(QuoteError::Cancelled);
            }

            match self.attempt(input, output, amount_raw, slippage_bps).await {
                Ok(quote) => {
                    self.breaker.record_success().await;
                    debug!(
                        "💱 견적 {} -> {}: in={} out={}",
                        input.symbol, output.symbol, quote.in_amount, quote.out_amount
                    );
                    return Ok(quote);
                }
                Err(e) => {
                    let backoff_secs = match &e {
                        QuoteError::RateLimited => RATE_LIMIT_BACKOFF_SECS.get(retries),
                        QuoteError::Network(_) => TRANSIENT_BACKOFF_SECS.get(retries),
                        QuoteError::Server { .. } => SERVER_BACKOFF_SECS.get(retries),
                        // 4xx, 잘못된 응답은 재시도하지 않는다
                        _ => None,
                    };

                    match backoff_secs {
                        Some(secs) => {
                            warn!(
                                "⚠️ 견적 실패({}) - {}초 후 재시도 {}/3",
                                e,
                                secs,
                                retries + 1
                            );
                            tokio::time::sleep(Duration::from_secs(*secs)).await;
                            retries += 1;
                        }
                        None => {
                            if e.counts_as_failure() {
                                self.breaker.record_failure().await;
                            }
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn sol() -> TokenInfo {
        TokenInfo::new(Pubkey::new_unique(), "SOL", 9)
    }

    fn usdc() -> TokenInfo {
        TokenInfo::new(Pubkey::new_unique(), "USDC", 6)
    }

    fn quote_body(in_amount: u64, out_amount: u64, impact: &str) -> serde_json::Value {
        serde_json::json!({
            "inAmount": in_amount.to_string(),
            "outAmount": out_amount.to_string(),
            "priceImpactPct": impact,
            "routePlan": [{"swapInfo": {"ammKey": "mock"}}],
        })
    }

    #[test]
    fn test_parse_valid_quote() {
        let input = sol();
        let output = usdc();
        let quote =
            parse_quote_body(quote_body(100, 17_100, "0.001"), &input, &output, 100, 50).unwrap();
        assert_eq!(quote.in_amount, 100);
        assert_eq!(quote.out_amount, 17_100);
        assert_eq!(quote.price_impact_pct, 0.001);
        assert_eq!(quote.slippage_bps, 50);
        assert!(quote.route.get("routePlan").is_some());
    }

    #[test]
    fn test_parse_rejects_zero_out_amount() {
        let input = sol();
        let output = usdc();
        let err =
            parse_quote_body(quote_body(100, 0, "0"), &input, &output, 100, 50).unwrap_err();
        assert!(matches!(err, QuoteError::Invalid(_)));
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let input = sol();
        let output = usdc();
        let err = parse_quote_body(serde_json::json!({}), &input, &output, 100, 50).unwrap_err();
        assert!(matches!(err, QuoteError::Invalid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_retry_then_open_circuit() {
        // 닫힌 포트 - 모든 시도가 네트워크 에러로 끝난다
        let config = QuoteConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            min_interval_ms: 0,
            max_per_minute: 10_000,
            circuit_threshold: 2,
            circuit_timeout_ms: 60_000,
        };
        let client = JupiterQuoteClient::new(&config, Arc::new(AtomicBool::new(false)));
        let input = sol();
        let output = usdc();

        let err = client.quote(&input, &output, 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::Network(_)));
        let err = client.quote(&input, &output, 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::Network(_)));

        // 연속 실패 2회로 서킷 오픈 - 다음 호출은 I/O 없이 즉시 실패
        let err = client.quote(&input, &output, 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::CircuitOpen));
    }

    #[tokio::test]
    async fn test_cancel_flag_short_circuits() {
        let config = QuoteConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            min_interval_ms: 0,
            max_per_minute: 10_000,
            circuit_threshold: 100,
            circuit_timeout_ms: 60_000,
        };
        let cancel = Arc::new(AtomicBool::new(true));
        let client = JupiterQuoteClient::new(&config, cancel);
        let err = client
            .quote(&sol(), &usdc(), 1_000, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Cancelled));
    }
}
