use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::oracle::PriceSource;

/// 스크립트 가능한 가격 소스
pub struct MockPriceSource {
    name: &'static str,
    available: bool,
    price: Mutex<Option<f64>>,
    fetches: AtomicUsize,
}

impl MockPriceSource {
    pub fn fixed(name: &'static str, price: f64) -> Self {
        Self {
            name,
            available: true,
            price: Mutex::new(Some(price)),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            available: true,
            price: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// 자격증명 없는 소스 - available() == false
    pub fn unavailable(name: &'static str) -> Self {
        Self {
            name,
            available: false,
            price: Mutex::new(Some(1.0)),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_price(&self, price: Option<f64>) {
        *self.price.lock().expect("price lock") = price;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn available(&self) -> bool {
        self.available
    }

    async fn fetch_usd(&self) -> Option<f64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        *self.price.lock().expect("price lock")
    }
}
