use anyhow::Result;
use async_trait::async_trait;

/// 기동 전 외부 준비 상태 게이트
///
/// 기동 시 한 번 조회된다. 실패하면 기동이 중단된다(Fatal).
#[async_trait]
pub trait ReadinessGate: Send + Sync {
    async fn check_ready(&self) -> Result<()>;
}

/// 기본 게이트 - 항상 준비 완료
pub struct AlwaysReady;

#[async_trait]
impl ReadinessGate for AlwaysReady {
    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_gate_is_ready() {
        assert!(AlwaysReady.check_ready().await.is_ok());
    }
}
