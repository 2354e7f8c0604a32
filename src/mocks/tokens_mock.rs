use anyhow::Result;
use async_trait::async_trait;

use crate::exchange::TokenDirectory;
use crate::types::TokenInfo;

/// 고정 토큰 디렉토리
pub struct MockTokenDirectory {
    anchor: TokenInfo,
    intermediates: Vec<TokenInfo>,
    balance_raw: u64,
}

impl MockTokenDirectory {
    pub fn new(anchor: TokenInfo, intermediates: Vec<TokenInfo>, balance_raw: u64) -> Self {
        Self {
            anchor,
            intermediates,
            balance_raw,
        }
    }
}

#[async_trait]
impl TokenDirectory for MockTokenDirectory {
    fn anchor(&self) -> &TokenInfo {
        &self.anchor
    }

    fn intermediates(&self) -> &[TokenInfo] {
        &self.intermediates
    }

    async fn balance(&self, _token: &TokenInfo) -> Result<u64> {
        Ok(self.balance_raw)
    }
}
