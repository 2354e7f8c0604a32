use anyhow::{anyhow, Context, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;

/// 트랜잭션 서명자
///
/// 코어는 공개키 조회와 메시지 서명만 요구하며 개인키를 보존하지 않는다.
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;
    fn sign_message(&self, message: &[u8]) -> Signature;
}

/// 환경변수의 base58 시크릿으로부터 로드되는 Keypair 서명자
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// 환경변수에서 키페어 로드 - 실패는 Fatal, 기동 중단
    pub fn from_env(env_name: &str) -> Result<Self> {
        let raw = std::env::var(env_name)
            .with_context(|| format!("환경변수 {} 가 설정되지 않았습니다", env_name))?;
        let bytes = bs58::decode(raw.trim())
            .into_vec()
            .map_err(|e| anyhow!("키페어 base58 디코드 실패: {}", e))?;
        let keypair =
            Keypair::from_bytes(&bytes).map_err(|e| anyhow!("키페어 파싱 실패: {}", e))?;
        Ok(Self { keypair })
    }
}

impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_verifies_against_pubkey() {
        let signer = KeypairSigner::new(Keypair::new());
        let message = b"xcycle test message";
        let signature = signer.sign_message(message);
        assert!(signature.verify(signer.pubkey().as_ref(), message));
    }

    #[test]
    fn test_from_env_roundtrip() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        std::env::set_var("XCYCLE_TEST_KEYPAIR", &encoded);

        let signer = KeypairSigner::from_env("XCYCLE_TEST_KEYPAIR").unwrap();
        assert_eq!(signer.pubkey(), keypair.pubkey());
        std::env::remove_var("XCYCLE_TEST_KEYPAIR");
    }

    #[test]
    fn test_missing_env_is_fatal() {
        assert!(KeypairSigner::from_env("XCYCLE_TEST_MISSING_KEY").is_err());
    }

    #[test]
    fn test_garbage_key_is_fatal() {
        std::env::set_var("XCYCLE_TEST_BAD_KEY", "not-base58-!!!");
        assert!(KeypairSigner::from_env("XCYCLE_TEST_BAD_KEY").is_err());
        std::env::remove_var("XCYCLE_TEST_BAD_KEY");
    }
}
