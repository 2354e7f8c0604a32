//! Mock 구현 모듈
//!
//! 아웃바운드 seam(견적, 트랜스포트, 가격 소스, 시계, 토큰 디렉토리)의
//! 테스트/드라이런용 구현. `API_MODE=mock` 환경에서는 운영 바이너리도
//! 이 구현들로 배선된다.

pub mod clock_mock;
pub mod price_mock;
pub mod quote_mock;
pub mod tokens_mock;
pub mod transport_mock;

pub use clock_mock::ManualClock;
pub use price_mock::MockPriceSource;
pub use quote_mock::{MockQuoteCall, MockQuoteService};
pub use tokens_mock::MockTokenDirectory;
pub use transport_mock::{MockSwapBuilder, MockTransport};

use std::env;

/// Mock 모드 여부
pub fn is_mock_mode() -> bool {
    env::var("API_MODE").unwrap_or_default() == "mock"
}
