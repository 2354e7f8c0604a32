use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use solana_sdk::transaction::VersionedTransaction;
use tracing::debug;

use super::wallet::TransactionSigner;

const SWAP_BUILD_TIMEOUT_SECS: u64 = 20;

/// 라우트 기술자로부터 서명된 스왑 트랜잭션을 만드는 seam
#[async_trait]
pub trait SwapTransactionBuilder: Send + Sync {
    async fn build_signed(
        &self,
        route: &serde_json::Value,
        priority_fee_lamports: Option<u64>,
    ) -> Result<VersionedTransaction>;
}

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

/// Jupiter v6 /swap 클라이언트
///
/// 견적 응답(라우트 기술자)을 그대로 넘겨 미서명 트랜잭션을 받고,
/// 서명자로 서명해 돌려준다. 트랜잭션 구성 자체는 애그리게이터 몫이다.
pub struct JupiterSwapClient {
    http: Client,
    base_url: String,
    signer: Arc<dyn TransactionSigner>,
}

impl JupiterSwapClient {
    pub fn new(base_url: impl Into<String>, signer: Arc<dyn TransactionSigner>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(SWAP_BUILD_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
            signer,
        }
    }
}

#[async_trait]
impl SwapTransactionBuilder for JupiterSwapClient {
    async fn build_signed(
        &self,
        route: &serde_json::Value,
        priority_fee_lamports: Option<u64>,
    ) -> Result<VersionedTransaction> {
        let url = format!("{}/swap", self.base_url);
        let mut body = json!({
            "quoteResponse": route,
            "userPublicKey": self.signer.pubkey().to_string(),
            "wrapAndUnwrapSol": true,
        });
        if let Some(fee) = priority_fee_lamports {
            body["prioritizationFeeLamports"] = json!(fee);
        }

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("스왑 빌드 실패: {} - {}", status, text));
        }
        let parsed: SwapResponse = response.json().await.context("스왑 응답 파싱 실패")?;

        let tx_bytes = BASE64
            .decode(parsed.swap_transaction.as_bytes())
            .context("swapTransaction base64 디코드 실패")?;
        let mut tx: VersionedTransaction =
            bincode::deserialize(&tx_bytes).context("트랜잭션 역직렬화 실패")?;

        let message = tx.message.serialize();
        let signature = self.signer.sign_message(&message);
        if tx.signatures.is_empty() {
            tx.signatures.push(signature);
        } else {
            tx.signatures[0] = signature;
        }
        debug!("✍️ 스왑 트랜잭션 서명 완료: {}", signature);
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::wallet::KeypairSigner;
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::signature::Keypair;

    #[test]
    fn test_swap_response_parsing() {
        let body = r#"{"swapTransaction":"AQIDBA=="}"#;
        let parsed: SwapResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.swap_transaction, "AQIDBA==");
    }

    #[test]
    fn test_sign_replaces_first_signature() {
        let signer = KeypairSigner::new(Keypair::new());
        let mut tx = VersionedTransaction {
            signatures: vec![solana_sdk::signature::Signature::default()],
            message: VersionedMessage::Legacy(Message::default()),
        };
        let message = tx.message.serialize();
        let signature = signer.sign_message(&message);
        tx.signatures[0] = signature;
        assert!(tx.signatures[0].verify(signer.pubkey().as_ref(), &message));
    }

    #[tokio::test]
    async fn test_unreachable_swap_api_errors() {
        let signer: Arc<dyn TransactionSigner> = Arc::new(KeypairSigner::new(Keypair::new()));
        let client = JupiterSwapClient::new("http://127.0.0.1:9", signer);
        let result = client.build_signed(&serde_json::json!({}), None).await;
        assert!(result.is_err());
    }
}
