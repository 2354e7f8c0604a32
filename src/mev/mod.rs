//! MEV 보호 실행 트랜스포트
//!
//! 서명된 트랜잭션을 우선순위 랜덤화 + 제출 지터 + 번들 우선/RPC 폴백
//! 정책으로 제출합니다.

pub mod bundle;
pub mod protection;
pub mod transport;

pub use bundle::BundleClient;
pub use protection::{ProtectionLevel, ProtectionParams};
pub use transport::{ExecutionTransport, MEVObservation, MevTransport};
