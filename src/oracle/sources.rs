use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::price_oracle::{sanitize_source_price, PriceSource};
use crate::constants::{BINANCE_PRICE_URL, COINGECKO_PRICE_URL, CRYPTOCOMPARE_PRICE_URL};

const SOURCE_TIMEOUT_SECS: u64 = 10;

fn build_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(SOURCE_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}

/// CoinGecko simple-price
pub struct CoinGeckoSource {
    http: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    solana: CoinGeckoEntry,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoEntry {
    usd: f64,
}

impl CoinGeckoSource {
    pub fn new() -> Self {
        Self {
            http: build_client(),
            url: COINGECKO_PRICE_URL.to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_usd(&self) -> Option<f64> {
        let response = match self.http.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("coingecko 가격 조회 실패: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("coingecko 응답 상태: {}", response.status());
            return None;
        }
        let parsed: CoinGeckoResponse = response.json().await.ok()?;
        sanitize_source_price(parsed.solana.usd)
    }
}

/// Binance 현물 티커 (SOLUSDT)
pub struct BinanceSource {
    http: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    price: String,
}

impl BinanceSource {
    pub fn new() -> Self {
        Self {
            http: build_client(),
            url: BINANCE_PRICE_URL.to_string(),
        }
    }
}

#[async_trait]
impl PriceSource for BinanceSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch_usd(&self) -> Option<f64> {
        let response = match self.http.get(&self.url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("binance 가격 조회 실패: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("binance 응답 상태: {}", response.status());
            return None;
        }
        let parsed: BinanceTicker = response.json().await.ok()?;
        sanitize_source_price(parsed.price.parse().ok()?)
    }
}

/// CryptoCompare - API 키가 환경에 없으면 건너뛴다
pub struct CryptoCompareSource {
    http: Client,
    url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CryptoCompareResponse {
    #[serde(rename = "USD")]
    usd: f64,
}

impl CryptoCompareSource {
    pub fn new(api_key_env: &str) -> Self {
        Self {
            http: build_client(),
            url: CRYPTOCOMPARE_PRICE_URL.to_string(),
            api_key: std::env::var(api_key_env).ok().filter(|k| !k.is_empty()),
        }
    }
}

#[async_trait]
impl PriceSource for CryptoCompareSource {
    fn name(&self) -> &'static str {
        "cryptocompare"
    }

    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_usd(&self) -> Option<f64> {
        let api_key = self.api_key.as_ref()?;
        let response = match self
            .http
            .get(&self.url)
            .header("authorization", format!("Apikey {}", api_key))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("cryptocompare 가격 조회 실패: {}", e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("cryptocompare 응답 상태: {}", response.status());
            return None;
        }
        let parsed: CryptoCompareResponse = response.json().await.ok()?;
        sanitize_source_price(parsed.usd)
    }
}
