//! 애그리게이터 견적 계층
//!
//! 레이트리밋 + 재시도 + 서킷 브레이커가 적용된 단일 레그 견적 클라이언트.

pub mod circuit_breaker;
pub mod client;
pub mod rate_limiter;

pub use circuit_breaker::CircuitBreaker;
pub use client::{JupiterQuoteClient, QuoteService};
pub use rate_limiter::RateLimiter;
