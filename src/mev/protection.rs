use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MevConfig;

/// 보호 수준 - 사이즈와 기대 수익으로부터 산출
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectionLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtectionLevel::Low => write!(f, "LOW"),
            ProtectionLevel::Medium => write!(f, "MEDIUM"),
            ProtectionLevel::High => write!(f, "HIGH"),
        }
    }
}

/// 실행당 한 번 산출되는 보호 파라미터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionParams {
    pub priority_fee_lamports: u64,
    pub send_delay_ms: u64,
    /// 번들 팁 (SOL) - 번들 비활성 시 0
    pub bundle_tip_sol: f64,
    pub level: ProtectionLevel,
}

impl ProtectionParams {
    /// 파라미터 산출
    ///
    /// - 우선순위: randomize_gas면 기본값 × U(0.8, 1.2), 하한 클램프
    /// - 제출 지터: U_int[0, max_submit_jitter_ms]
    /// - 번들 팁: clamp(기대 USD 수익 × 0.1, 0.001, 0.01) SOL
    /// - 보호 수준: 0.6·(size/max) + 0.4·(profit_pct/5), 0.8/0.5 경계
    pub fn derive(
        size_sol: f64,
        expected_profit_pct: f64,
        expected_profit_usd: f64,
        config: &MevConfig,
        max_trade_size_sol: f64,
    ) -> Self {
        let mut rng = rand::thread_rng();

        let priority_fee_lamports = if config.randomize_gas {
            let factor: f64 = rng.gen_range(0.8..=1.2);
            let randomized = (config.base_priority_fee_lamports as f64 * factor).round() as u64;
            randomized.max(config.min_priority_fee_lamports)
        } else {
            config.base_priority_fee_lamports
        };

        let send_delay_ms = if config.max_submit_jitter_ms > 0 {
            rng.gen_range(0..=config.max_submit_jitter_ms)
        } else {
            0
        };

        let bundle_tip_sol = if config.use_bundles {
            (expected_profit_usd * 0.1).clamp(0.001, 0.01)
        } else {
            0.0
        };

        let size_ratio = if max_trade_size_sol > 0.0 {
            size_sol / max_trade_size_sol
        } else {
            0.0
        };
        let score = 0.6 * size_ratio + 0.4 * (expected_profit_pct / 5.0);
        let level = if score >= 0.8 {
            ProtectionLevel::High
        } else if score >= 0.5 {
            ProtectionLevel::Medium
        } else {
            ProtectionLevel::Low
        };

        Self {
            priority_fee_lamports,
            send_delay_ms,
            bundle_tip_sol,
            level,
        }
    }
}
