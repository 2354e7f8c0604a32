// xCycle Triangular Arbitrage Searcher Library

#![allow(dead_code)]

pub mod common;
pub mod config;
pub mod constants;
pub mod engine;
pub mod exchange;
pub mod logging;
pub mod mev;
pub mod mocks;
pub mod oracle;
pub mod quote;
pub mod sizer;

// Core types
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use engine::SearchEngine;
pub use mev::MevTransport;
pub use oracle::SolPriceOracle;
pub use quote::JupiterQuoteClient;
pub use sizer::DynamicSizer;
