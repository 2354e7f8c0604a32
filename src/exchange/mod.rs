//! 체인 연동 계층
//!
//! 서명자, 토큰 디렉토리, 스왑 트랜잭션 빌더 등 코어가 소비하는
//! 외부 협력자 인터페이스와 그 운영 구현.

pub mod preflight;
pub mod swap;
pub mod tokens;
pub mod wallet;

pub use preflight::{AlwaysReady, ReadinessGate};
pub use swap::{JupiterSwapClient, SwapTransactionBuilder};
pub use tokens::{OnchainTokenDirectory, TokenDirectory};
pub use wallet::{KeypairSigner, TransactionSigner};
