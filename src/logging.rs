//! 카테고리 태그 로깅 헬퍼
//!
//! tracing 위에 `category` 필드를 붙이는 설탕. 쓰기 실패가 호출자로
//! 전파되지 않는다는 점은 tracing 자체가 보장한다.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 구독자 초기화 - 프로세스 id를 모든 이벤트 스팬에 심는다
pub fn init_tracing(default_level: &str) {
    let process_id = std::process::id();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(process_id, "로깅 초기화 완료");
}

pub fn trade(message: &str) {
    info!(category = "trade", process_id = std::process::id(), "{}", message);
}

pub fn performance(message: &str) {
    info!(category = "performance", process_id = std::process::id(), "{}", message);
}

pub fn balance(message: &str) {
    info!(category = "balance", process_id = std::process::id(), "{}", message);
}

pub fn rpc(message: &str) {
    info!(category = "rpc", process_id = std::process::id(), "{}", message);
}

pub fn rotation(message: &str) {
    info!(category = "rotation", process_id = std::process::id(), "{}", message);
}

pub fn arbitrage(message: &str) {
    info!(category = "arbitrage", process_id = std::process::id(), "{}", message);
}

pub fn arbitrage_warn(message: &str) {
    warn!(category = "arbitrage", process_id = std::process::id(), "{}", message);
}
