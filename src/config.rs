use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::common::math::floor_size;
use crate::constants::{DEFAULT_BLOCK_ENGINE_URLS, DEFAULT_QUOTE_API_URL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// 키페어를 담은 환경변수 이름 (base58 시크릿). 코어는 키를 보존하지 않는다.
    pub keypair_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    pub anchor: TokenEntry,
    /// 중간 자산 링 - 순서대로 로테이션
    pub intermediates: Vec<TokenEntry>,
}

/// 거래 임계값 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// false면 실행 없이 프로브와 로깅만 수행
    pub enabled: bool,
    /// 사이징 탐색 상한 (SOL)
    pub max_trade_size_sol: f64,
    /// 사이징 탐색 하한 (SOL)
    pub min_trade_size_sol: f64,
    /// 레그2 수익률 하한 (%)
    pub min_profit_pct: f64,
    /// USD 수익 하한
    pub min_profit_usd: f64,
    /// 양 레그 합산 가격 영향 상한 (%)
    pub max_price_impact_pct: f64,
    /// 견적 API에 전달되는 슬리피지 허용치 (bps)
    pub max_slippage_bps: u16,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SizeStrategy {
    Stepped,
    Optimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    pub strategy: SizeStrategy,
    /// 틱당 프로브 수
    pub size_tests: usize,
    /// optimal 전략 전용 - (0,100) 범위의 퍼센트 지점들
    pub preferred_percentages: Vec<u8>,
    /// 프로브 간 슬립 (레이트리밋 배려)
    pub probe_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub iteration_interval_ms: u64,
    pub rotation_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MevConfig {
    pub enabled: bool,
    /// 우선 번들 제출을 먼저 시도
    pub use_bundles: bool,
    /// HIGH 보호 수준에서만 시도되는 프라이빗 풀 경로
    pub use_private_pool: bool,
    /// 실행마다 우선순위 수수료 ±20% 랜덤화
    pub randomize_gas: bool,
    /// 제출 지터 상한 (ms)
    pub max_submit_jitter_ms: u64,
    pub bundle_timeout_ms: u64,
    pub block_engine_urls: Vec<String>,
    pub base_priority_fee_lamports: u64,
    pub min_priority_fee_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    pub base_url: String,
    /// 견적 호출 간 최소 간격 (ms)
    pub min_interval_ms: u64,
    /// 롤링 1분 윈도우 상한
    pub max_per_minute: usize,
    /// 서킷 오픈까지의 연속 실패 수
    pub circuit_threshold: u32,
    /// 오픈 → 하프오픈 쿨다운 (ms)
    pub circuit_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceConfig {
    pub refresh_interval_ms: u64,
    /// 자격증명이 필요한 소스용 - 비어 있으면 해당 소스는 건너뜀
    pub cryptocompare_api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub wallet: WalletConfig,
    pub tokens: TokensConfig,
    pub trading: TradingConfig,
    pub sizing: SizingConfig,
    pub engine: EngineConfig,
    pub mev: MevConfig,
    pub quote: QuoteConfig,
    pub price: PriceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            },
            wallet: WalletConfig {
                keypair_env: "XCYCLE_KEYPAIR".to_string(),
            },
            tokens: TokensConfig {
                anchor: TokenEntry {
                    mint: crate::constants::SOL_MINT.to_string(),
                    symbol: "SOL".to_string(),
                    decimals: 9,
                },
                intermediates: vec![
                    TokenEntry {
                        mint: crate::constants::USDC_MINT.to_string(),
                        symbol: "USDC".to_string(),
                        decimals: 6,
                    },
                    TokenEntry {
                        mint: crate::constants::USDT_MINT.to_string(),
                        symbol: "USDT".to_string(),
                        decimals: 6,
                    },
                    TokenEntry {
                        mint: crate::constants::JUP_MINT.to_string(),
                        symbol: "JUP".to_string(),
                        decimals: 6,
                    },
                ],
            },
            trading: TradingConfig {
                enabled: false,
                max_trade_size_sol: 0.1,
                min_trade_size_sol: 0.005,
                min_profit_pct: 0.3,
                min_profit_usd: 0.50,
                max_price_impact_pct: 2.0,
                max_slippage_bps: 100,
            },
            sizing: SizingConfig {
                strategy: SizeStrategy::Optimal,
                size_tests: 5,
                preferred_percentages: vec![10, 25, 50, 75, 90],
                probe_delay_ms: 500,
            },
            engine: EngineConfig {
                iteration_interval_ms: 8_000,
                rotation_interval_ms: 120_000,
            },
            mev: MevConfig {
                enabled: false,
                use_bundles: false,
                use_private_pool: false,
                randomize_gas: false,
                max_submit_jitter_ms: 2_000,
                bundle_timeout_ms: 30_000,
                block_engine_urls: DEFAULT_BLOCK_ENGINE_URLS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                base_priority_fee_lamports: 100_000,
                min_priority_fee_lamports: 10_000,
            },
            quote: QuoteConfig {
                base_url: DEFAULT_QUOTE_API_URL.to_string(),
                min_interval_ms: 2_000,
                max_per_minute: 30,
                circuit_threshold: 5,
                circuit_timeout_ms: 60_000,
            },
            price: PriceConfig {
                refresh_interval_ms: 30_000,
                cryptocompare_api_key_env: "CRYPTOCOMPARE_API_KEY".to_string(),
            },
        }
    }
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 정합성 검증 - 실패는 Fatal, 기동 중단
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            return Err(anyhow::anyhow!("network.rpc_url cannot be empty"));
        }
        if self.tokens.intermediates.is_empty() {
            return Err(anyhow::anyhow!(
                "tokens.intermediates must contain at least one token"
            ));
        }
        if self.trading.min_trade_size_sol <= 0.0 {
            return Err(anyhow::anyhow!("trading.min_trade_size_sol must be positive"));
        }
        if self.trading.min_trade_size_sol > self.trading.max_trade_size_sol {
            return Err(anyhow::anyhow!(
                "trading.min_trade_size_sol must not exceed max_trade_size_sol"
            ));
        }
        if self.trading.min_profit_pct <= 0.0 || self.trading.min_profit_usd <= 0.0 {
            return Err(anyhow::anyhow!("profit floors must be positive"));
        }
        if self.sizing.size_tests == 0 {
            return Err(anyhow::anyhow!("sizing.size_tests must be greater than 0"));
        }
        if self.sizing.strategy == SizeStrategy::Optimal
            && self
                .sizing
                .preferred_percentages
                .iter()
                .any(|p| *p == 0 || *p >= 100)
        {
            return Err(anyhow::anyhow!(
                "sizing.preferred_percentages must be within (0, 100)"
            ));
        }
        if self.quote.max_per_minute == 0 {
            return Err(anyhow::anyhow!("quote.max_per_minute must be greater than 0"));
        }
        if self.quote.circuit_threshold == 0 {
            return Err(anyhow::anyhow!(
                "quote.circuit_threshold must be greater than 0"
            ));
        }
        if self.mev.use_bundles && self.mev.block_engine_urls.is_empty() {
            return Err(anyhow::anyhow!(
                "mev.block_engine_urls required when bundles are enabled"
            ));
        }
        Ok(())
    }

    /// 기동 시 앵커 잔고에 따른 가드 적용
    ///
    /// 잔고가 0이면 거래를 강제 비활성화하고, 탐색 상한이 잔고의 90%를
    /// 넘으면 `floor(0.9 × 잔고)`로 내린다 (4자리 내림).
    pub fn clamp_to_balance(&mut self, anchor_balance_sol: f64) -> BalanceGuard {
        if anchor_balance_sol <= 0.0 {
            let was_enabled = self.trading.enabled;
            self.trading.enabled = false;
            return BalanceGuard::TradingDisabled { was_enabled };
        }

        let ceiling = anchor_balance_sol * 0.9;
        if self.trading.max_trade_size_sol > ceiling {
            let clamped = floor_size(ceiling);
            let previous = self.trading.max_trade_size_sol;
            self.trading.max_trade_size_sol = clamped;
            if self.trading.min_trade_size_sol > clamped {
                self.trading.min_trade_size_sol = clamped;
            }
            return BalanceGuard::SizeClamped { previous, clamped };
        }

        BalanceGuard::Unchanged
    }

    #[cfg(test)]
    pub fn load_test_config() -> Self {
        let mut config = Self::default();
        // 테스트에서 슬립 시간을 없애 빠르게 돈다
        config.sizing.probe_delay_ms = 0;
        config.engine.iteration_interval_ms = 10;
        config.engine.rotation_interval_ms = 50;
        config.quote.min_interval_ms = 0;
        config.quote.max_per_minute = 10_000;
        config
    }
}

/// clamp_to_balance 적용 결과 (기동 로그용)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalanceGuard {
    Unchanged,
    TradingDisabled { was_enabled: bool },
    SizeClamped { previous: f64, clamped: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_documented_values() {
        let config = Config::default();
        assert!(!config.trading.enabled);
        assert_eq!(config.trading.max_trade_size_sol, 0.1);
        assert_eq!(config.trading.min_trade_size_sol, 0.005);
        assert_eq!(config.sizing.strategy, SizeStrategy::Optimal);
        assert_eq!(config.sizing.size_tests, 5);
        assert_eq!(config.sizing.preferred_percentages, vec![10, 25, 50, 75, 90]);
        assert_eq!(config.trading.min_profit_pct, 0.3);
        assert_eq!(config.trading.min_profit_usd, 0.50);
        assert_eq!(config.trading.max_price_impact_pct, 2.0);
        assert_eq!(config.trading.max_slippage_bps, 100);
        assert_eq!(config.sizing.probe_delay_ms, 500);
        assert_eq!(config.engine.iteration_interval_ms, 8_000);
        assert_eq!(config.engine.rotation_interval_ms, 120_000);
        assert_eq!(config.quote.min_interval_ms, 2_000);
        assert_eq!(config.quote.max_per_minute, 30);
        assert_eq!(config.quote.circuit_threshold, 5);
        assert_eq!(config.quote.circuit_timeout_ms, 60_000);
        assert_eq!(config.price.refresh_interval_ms, 30_000);
        assert_eq!(config.mev.max_submit_jitter_ms, 2_000);
    }

    #[test]
    fn test_validation_rejects_inconsistent_values() {
        let mut config = Config::default();
        config.trading.min_trade_size_sol = 0.5; // > max
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sizing.size_tests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sizing.preferred_percentages = vec![10, 100];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tokens.intermediates.clear();
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_balance_forces_trading_off() {
        let mut config = Config::default();
        config.trading.enabled = true;
        let guard = config.clamp_to_balance(0.0);
        assert!(!config.trading.enabled);
        assert_eq!(guard, BalanceGuard::TradingDisabled { was_enabled: true });
    }

    #[test]
    fn test_small_balance_clamps_max_size() {
        let mut config = Config::default();
        config.trading.max_trade_size_sol = 0.1;
        let guard = config.clamp_to_balance(0.05);
        match guard {
            BalanceGuard::SizeClamped { previous, clamped } => {
                assert_eq!(previous, 0.1);
                assert_eq!(clamped, 0.045);
            }
            other => panic!("expected clamp, got {:?}", other),
        }
        assert_eq!(config.trading.max_trade_size_sol, 0.045);
    }

    #[test]
    fn test_large_balance_leaves_config_alone() {
        let mut config = Config::default();
        let guard = config.clamp_to_balance(10.0);
        assert_eq!(guard, BalanceGuard::Unchanged);
        assert_eq!(config.trading.max_trade_size_sol, 0.1);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            config.trading.max_trade_size_sol,
            deserialized.trading.max_trade_size_sol
        );
        assert_eq!(config.sizing.strategy, deserialized.sizing.strategy);
        assert_eq!(
            config.tokens.intermediates.len(),
            deserialized.tokens.intermediates.len()
        );
    }
}
