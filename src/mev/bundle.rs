use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// 번들 제출 응답 envelope
#[derive(Debug, Deserialize)]
struct BundleResponse {
    result: Option<String>,
    error: Option<BundleError>,
}

#[derive(Debug, Deserialize)]
struct BundleError {
    code: i64,
    message: String,
}

/// 블록 엔진 번들 클라이언트
///
/// 단일 트랜잭션 번들을 `sendBundle` JSON-RPC로 제출한다.
/// 엔드포인트 목록을 라운드로빈으로 순회한다.
pub struct BundleClient {
    http: Client,
    endpoints: Vec<String>,
    cursor: AtomicUsize,
    submit_timeout: Duration,
}

impl BundleClient {
    pub fn new(endpoints: Vec<String>, submit_timeout_ms: u64) -> Self {
        Self {
            http: Client::new(),
            endpoints,
            cursor: AtomicUsize::new(0),
            submit_timeout: Duration::from_millis(submit_timeout_ms),
        }
    }

    fn next_endpoint(&self) -> Option<&str> {
        if self.endpoints.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.endpoints.len();
        Some(self.endpoints[index].as_str())
    }

    /// base64 직렬화 트랜잭션 하나를 번들로 제출하고 번들 id를 반환
    pub async fn submit(&self, tx_base64: &str) -> Result<String> {
        let endpoint = self
            .next_endpoint()
            .ok_or_else(|| anyhow!("설정된 블록 엔진 엔드포인트가 없습니다"))?;
        let url = format!("{}/api/v1/bundles", endpoint);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sendBundle",
            "params": [[tx_base64]],
        });

        debug!("📦 번들 제출: {}", url);

        let response = tokio::time::timeout(
            self.submit_timeout,
            self.http.post(&url).json(&body).send(),
        )
        .await
        .map_err(|_| anyhow!("번들 제출 타임아웃 ({}ms)", self.submit_timeout.as_millis()))??;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("❌ 블록 엔진 응답 오류: {} - {}", status, text);
            return Err(anyhow!("블록 엔진 응답 오류: {}", status));
        }

        let parsed: BundleResponse = response.json().await?;
        if let Some(error) = parsed.error {
            return Err(anyhow!("번들 거부: {} ({})", error.message, error.code));
        }
        parsed
            .result
            .ok_or_else(|| anyhow!("번들 응답에 result가 없습니다"))
    }
}
