//! 금액 산술 유틸리티
//!
//! 모든 원시 금액(최소 단위) 연산은 정수(u128/i128)로 수행한다.
//! 부동소수점은 수익률(%), USD 환산, 표시용 문자열에만 쓴다.

/// UI 단위 금액을 원시 금액(최소 단위)으로 변환
///
/// 사이즈는 4자리 반올림 후 변환되므로 decimals ≥ 4 인 토큰에서 손실이 없다.
pub fn to_raw_amount(ui_amount: f64, decimals: u8) -> u64 {
    (ui_amount * 10f64.powi(decimals as i32)).round() as u64
}

/// 원시 금액을 UI 단위로 변환 (표시/USD 계산 전용, 손실 있음)
pub fn to_ui_amount(raw: u128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// 라운드트립 수익을 bp(1/100 퍼센트) 정수로 계산
///
/// `profit_raw * 10000 / size_raw` - 전부 i128 연산이라 반올림 오차가 없다.
pub fn profit_basis_points(profit_raw: i128, size_raw: u128) -> i64 {
    if size_raw == 0 {
        return 0;
    }
    (profit_raw * 10_000 / size_raw as i128) as i64
}

/// bp를 퍼센트 부동소수점으로 (로그/비교 전용)
pub fn bps_to_pct(bps: i64) -> f64 {
    bps as f64 / 100.0
}

/// 사이즈를 4자리로 반올림
pub fn round_size(size: f64) -> f64 {
    (size * 10_000.0).round() / 10_000.0
}

/// 4자리 내림 (잔고 클램프용)
pub fn floor_size(size: f64) -> f64 {
    (size * 10_000.0).floor() / 10_000.0
}

/// 원시 수익을 USD로 환산
pub fn profit_to_usd(profit_raw: i128, decimals: u8, anchor_usd: f64) -> f64 {
    (profit_raw as f64 / 10f64.powi(decimals as i32)) * anchor_usd
}
