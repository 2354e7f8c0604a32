use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use tracing::debug;

use crate::config::TokensConfig;
use crate::types::TokenInfo;

/// 토큰 디렉토리 - 앵커 자산과 중간 자산 링, 잔고 조회
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    fn anchor(&self) -> &TokenInfo;
    fn intermediates(&self) -> &[TokenInfo];
    async fn balance(&self, token: &TokenInfo) -> Result<u64>;
}

/// 설정 기반 디렉토리 + RPC 잔고 조회
pub struct OnchainTokenDirectory {
    anchor: TokenInfo,
    intermediates: Vec<TokenInfo>,
    owner: Pubkey,
    rpc: Arc<RpcClient>,
}

impl OnchainTokenDirectory {
    pub fn from_config(
        config: &TokensConfig,
        owner: Pubkey,
        rpc: Arc<RpcClient>,
    ) -> Result<Self> {
        let anchor = TokenInfo::new(
            Pubkey::from_str(&config.anchor.mint)
                .with_context(|| format!("앵커 민트 파싱 실패: {}", config.anchor.mint))?,
            config.anchor.symbol.clone(),
            config.anchor.decimals,
        );
        let mut intermediates = Vec::with_capacity(config.intermediates.len());
        for entry in &config.intermediates {
            intermediates.push(TokenInfo::new(
                Pubkey::from_str(&entry.mint)
                    .with_context(|| format!("중간 민트 파싱 실패: {}", entry.mint))?,
                entry.symbol.clone(),
                entry.decimals,
            ));
        }
        Ok(Self {
            anchor,
            intermediates,
            owner,
            rpc,
        })
    }
}

#[async_trait]
impl TokenDirectory for OnchainTokenDirectory {
    fn anchor(&self) -> &TokenInfo {
        &self.anchor
    }

    fn intermediates(&self) -> &[TokenInfo] {
        &self.intermediates
    }

    async fn balance(&self, token: &TokenInfo) -> Result<u64> {
        if *token == self.anchor {
            // 앵커(SOL)는 네이티브 잔고
            return Ok(self.rpc.get_balance(&self.owner).await?);
        }

        let ata = get_associated_token_address(&self.owner, &token.mint);
        match self.rpc.get_token_account_balance(&ata).await {
            Ok(amount) => Ok(amount.amount.parse().unwrap_or(0)),
            Err(e) => {
                // ATA 미존재는 잔고 0과 동치
                debug!("토큰 계정 {} 조회 실패 ({}): {}", token.symbol, ata, e);
                Ok(0)
            }
        }
    }
}
