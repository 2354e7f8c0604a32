use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{PRICE_BAND_MAX_USD, PRICE_BAND_MIN_USD};

/// 외부 가격 소스
///
/// 각 소스는 양수 유한 가격을 반환하거나 None으로 실패를 알린다.
/// 자격증명이 필요한 소스는 증명이 없으면 `available() == false`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn available(&self) -> bool {
        true
    }

    async fn fetch_usd(&self) -> Option<f64>;
}

/// 가격 샘플
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price_usd: Decimal,
    /// 이 샘플에 기여한 소스 이름들
    pub sources: Vec<String>,
}

/// 최근 윈도우 추세
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTrend {
    Rising,
    Falling,
    Stable,
}

impl std::fmt::Display for PriceTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceTrend::Rising => write!(f, "RISING"),
            PriceTrend::Falling => write!(f, "FALLING"),
            PriceTrend::Stable => write!(f, "STABLE"),
        }
    }
}

/// 집계 가격이 타당성 범위 안인지
pub fn within_plausibility_band(price_usd: f64) -> bool {
    price_usd.is_finite() && (PRICE_BAND_MIN_USD..=PRICE_BAND_MAX_USD).contains(&price_usd)
}

/// 소스 응답 검증 - 양수 유한값만 통과
pub fn sanitize_source_price(price: f64) -> Option<f64> {
    if price.is_finite() && price > 0.0 {
        Some(price)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausibility_band() {
        assert!(within_plausibility_band(1.0));
        assert!(within_plausibility_band(171.55));
        assert!(within_plausibility_band(10_000.0));
        assert!(!within_plausibility_band(0.99));
        assert!(!within_plausibility_band(10_000.01));
        assert!(!within_plausibility_band(f64::NAN));
        assert!(!within_plausibility_band(f64::INFINITY));
    }

    #[test]
    fn test_sanitize_source_price() {
        assert_eq!(sanitize_source_price(150.0), Some(150.0));
        assert_eq!(sanitize_source_price(0.0), None);
        assert_eq!(sanitize_source_price(-1.0), None);
        assert_eq!(sanitize_source_price(f64::NAN), None);
    }
}
