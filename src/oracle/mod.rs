//! 앵커 자산(SOL) USD 가격 오라클
//!
//! N개의 외부 소스를 병렬 폴링해 평균가를 유지합니다.

pub mod aggregator;
pub mod price_oracle;
pub mod sources;

pub use aggregator::SolPriceOracle;
pub use price_oracle::{PricePoint, PriceSource, PriceTrend};
pub use sources::{BinanceSource, CoinGeckoSource, CryptoCompareSource};
