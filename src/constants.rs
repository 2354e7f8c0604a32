// Time constants (in milliseconds unless noted)
pub const PROBE_LEG_PAUSE_MS: u64 = 200;
pub const INTER_LEG_SETTLE_MS: u64 = 3_000;
pub const MEV_MONITOR_DELAY_MS: u64 = 5_000;
pub const SHUTDOWN_GRACE_MS: u64 = 15_000;

// Quote client timeouts
pub const QUOTE_ATTEMPT_TIMEOUT_SECS: u64 = 20;
pub const QUOTE_QUEUE_TIMEOUT_SECS: u64 = 30;

// SOL/USD 타당성 범위 - SOL 전용 휴리스틱, 앵커 자산을 바꾸면 재산정 필요
pub const PRICE_BAND_MIN_USD: f64 = 1.0;
pub const PRICE_BAND_MAX_USD: f64 = 10_000.0;

// Bounded history sizes
pub const PRICE_HISTORY_MAX: usize = 100;
pub const PAIR_SAMPLES_MAX: usize = 100;
pub const ITERATION_RECORDS_MAX: usize = 200;
pub const MEV_OBSERVATIONS_MAX: usize = 500;

// Retention
pub const PAIR_SAMPLE_TTL_HOURS: i64 = 24;
pub const MEV_OBSERVATION_TTL_HOURS: i64 = 24;

// Housekeeping cadence (iterations)
pub const MEMORY_RECLAIM_EVERY: u64 = 50;
pub const STORE_CLEANUP_EVERY: u64 = 100;

// Lamports per SOL
pub const LAMPORTS_PER_SOL_F64: f64 = 1_000_000_000.0;

// Common mint addresses (mainnet)
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
pub const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
pub const JUP_MINT: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

// Aggregator endpoints
pub const DEFAULT_QUOTE_API_URL: &str = "https://quote-api.jup.ag/v6";

// Jito block engine bundle endpoints (round-robin)
pub const DEFAULT_BLOCK_ENGINE_URLS: &[&str] = &[
    "https://mainnet.block-engine.jito.wtf",
    "https://amsterdam.mainnet.block-engine.jito.wtf",
    "https://ny.mainnet.block-engine.jito.wtf",
    "https://tokyo.mainnet.block-engine.jito.wtf",
];

// Anchor price source endpoints
pub const COINGECKO_PRICE_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=solana&vs_currencies=usd";
pub const BINANCE_PRICE_URL: &str =
    "https://api.binance.com/api/v3/ticker/price?symbol=SOLUSDT";
pub const CRYPTOCOMPARE_PRICE_URL: &str =
    "https://min-api.cryptocompare.com/data/price?fsym=SOL&tsyms=USD";
