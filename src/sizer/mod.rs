//! 동적 트레이드 사이저
//!
//! `[min, max]` 범위에서 프로브 사이즈를 생성해 양 레그 견적으로 평가하고,
//! 스코어가 가장 높은 수익 사이즈를 고릅니다. 페어별 히스토리를 학습
//! 저장소에 유지합니다.

pub mod dynamic_sizer;
pub mod performance_store;

pub use dynamic_sizer::DynamicSizer;
pub use performance_store::{PairPerformance, PairPerformanceStore};
