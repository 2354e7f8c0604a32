use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use tokio::signal;
use tracing::{error, info, warn};

use xcycle::common::math::to_ui_amount;
use xcycle::common::time::{Clock, SystemClock};
use xcycle::config::{BalanceGuard, Config};
use xcycle::engine::SearchEngine;
use xcycle::exchange::{
    AlwaysReady, JupiterSwapClient, KeypairSigner, OnchainTokenDirectory, ReadinessGate,
    SwapTransactionBuilder, TokenDirectory, TransactionSigner,
};
use xcycle::logging;
use xcycle::mev::{ExecutionTransport, MevTransport};
use xcycle::mocks::{self, MockPriceSource, MockQuoteService, MockSwapBuilder, MockTransport};
use xcycle::oracle::{
    BinanceSource, CoinGeckoSource, CryptoCompareSource, PriceSource, SolPriceOracle,
};
use xcycle::quote::{JupiterQuoteClient, QuoteService};
use xcycle::sizer::DynamicSizer;

fn print_banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  xCycle - SOL 삼각 아비트래지 서쳐   ║");
    info!("║  A → B → A 라운드트립 스캔/실행      ║");
    info!("╚══════════════════════════════════════╝");
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 로드 (없어도 무방 - 시스템 환경변수 사용)
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("Could not load .env file: {}", e);
    }

    let matches = Command::new("xcycle")
        .version("0.3.0")
        .author("xCycle Team <team@xcycle.dev>")
        .about("Solana 삼각 아비트래지 서쳐 봇 - Jupiter 기반 라운드트립 스캔/실행")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로")
                .default_value("config/default.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("simulation")
                .long("simulation")
                .help("시뮬레이션 모드 (실행 없이 프로브와 로깅만)")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    logging::init_tracing(log_level);

    print_banner();

    // 설정 로드 - 파일이 없으면 기본값으로 기동
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config/default.toml");
    let mut config = if tokio::fs::try_exists(config_path).await.unwrap_or(false) {
        info!("📋 설정 파일 로드: {}", config_path);
        Config::load(config_path).await?
    } else {
        warn!("⚠️ 설정 파일 {} 없음 - 기본값 사용", config_path);
        Config::default()
    };

    if matches.get_flag("simulation") {
        warn!("🧪 시뮬레이션 모드 - 실제 실행 없음");
        config.trading.enabled = false;
    }

    config.validate().context("설정 검증 실패")?;

    // 기동 전 준비 게이트
    AlwaysReady
        .check_ready()
        .await
        .context("준비 게이트 실패 - 기동 중단")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = Arc::new(AtomicBool::new(false));

    let engine = if mocks::is_mock_mode() {
        build_mock_engine(config, Arc::clone(&clock), Arc::clone(&cancel)).await?
    } else {
        build_engine(config, Arc::clone(&clock), Arc::clone(&cancel)).await?
    };

    // 종료 신호 핸들러 - 취소는 틱 경계에서 관측된다
    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("🛑 종료 신호 수신 - 취소 플래그 설정");
                engine.signal_shutdown();
            }
        });
    }

    if let Err(e) = engine.run().await {
        error!("❌ 탐색 루프 종료 오류: {:#}", e);
        return Err(e);
    }

    info!("✅ xCycle 종료 완료");
    Ok(())
}

/// 운영 배선
async fn build_engine(
    mut config: Config,
    clock: Arc<dyn Clock>,
    cancel: Arc<AtomicBool>,
) -> Result<Arc<SearchEngine>> {
    // 서명자 - 거래 활성 시 키 부재는 Fatal
    let signer: Arc<dyn TransactionSigner> =
        match KeypairSigner::from_env(&config.wallet.keypair_env) {
            Ok(signer) => Arc::new(signer),
            Err(e) if config.trading.enabled => {
                return Err(e.context("거래 활성 상태에서 서명자 로드 실패"));
            }
            Err(e) => {
                warn!("⚠️ 서명자 로드 실패 ({:#}) - 임시 키로 시뮬레이션 진행", e);
                Arc::new(KeypairSigner::new(Keypair::new()))
            }
        };

    let rpc = Arc::new(RpcClient::new(config.network.rpc_url.clone()));
    let tokens: Arc<dyn TokenDirectory> = Arc::new(OnchainTokenDirectory::from_config(
        &config.tokens,
        signer.pubkey(),
        Arc::clone(&rpc),
    )?);

    // 기동 시 앵커 잔고 가드
    let anchor = tokens.anchor().clone();
    match tokens.balance(&anchor).await {
        Ok(balance_raw) => {
            let balance_sol = to_ui_amount(balance_raw as u128, anchor.decimals);
            logging::balance(&format!("앵커 잔고: {:.4} {}", balance_sol, anchor.symbol));
            match config.clamp_to_balance(balance_sol) {
                BalanceGuard::Unchanged => {}
                BalanceGuard::TradingDisabled { .. } => {
                    logging::balance("앵커 잔고 0 - 거래 강제 비활성화");
                }
                BalanceGuard::SizeClamped { previous, clamped } => {
                    logging::balance(&format!(
                        "탐색 상한 클램프: {} -> {} SOL (잔고의 90%)",
                        previous, clamped
                    ));
                }
            }
        }
        Err(e) if config.trading.enabled => {
            return Err(e.context("앵커 잔고 조회 실패 - 거래 활성 상태에서는 중단"));
        }
        Err(e) => warn!("⚠️ 앵커 잔고 조회 실패 (시뮬레이션 계속): {:#}", e),
    }

    let config = Arc::new(config);

    // 가격 오라클 + 백그라운드 갱신
    let sources: Vec<Arc<dyn PriceSource>> = vec![
        Arc::new(CoinGeckoSource::new()),
        Arc::new(BinanceSource::new()),
        Arc::new(CryptoCompareSource::new(
            &config.price.cryptocompare_api_key_env,
        )),
    ];
    let oracle = Arc::new(SolPriceOracle::new(
        sources,
        Arc::clone(&clock),
        config.price.refresh_interval_ms,
    ));
    if !oracle.refresh().await {
        warn!("⚠️ 초기 가격 조회 실패 - 백그라운드 갱신에서 재시도");
    }
    // JoinHandle은 분리 실행 - 취소 플래그로 종료된다
    let _refresh_task = oracle.spawn_refresh_task(Arc::clone(&cancel));

    let quote: Arc<dyn QuoteService> = Arc::new(JupiterQuoteClient::new(
        &config.quote,
        Arc::clone(&cancel),
    ));
    let sizer = Arc::new(DynamicSizer::new(
        Arc::clone(&config),
        quote,
        Arc::clone(&clock),
        Arc::clone(&cancel),
    ));
    let transport: Arc<dyn ExecutionTransport> = Arc::new(MevTransport::new(
        config.mev.clone(),
        Arc::clone(&rpc),
        Arc::clone(&clock),
    ));
    let swap_builder: Arc<dyn SwapTransactionBuilder> = Arc::new(JupiterSwapClient::new(
        config.quote.base_url.clone(),
        Arc::clone(&signer),
    ));

    Ok(Arc::new(SearchEngine::new(
        config,
        clock,
        oracle,
        sizer,
        transport,
        swap_builder,
        tokens,
        cancel,
    )))
}

/// Mock 배선 (API_MODE=mock) - 네트워크 없이 엔진 전체를 드라이런
async fn build_mock_engine(
    config: Config,
    clock: Arc<dyn Clock>,
    cancel: Arc<AtomicBool>,
) -> Result<Arc<SearchEngine>> {
    warn!("🎭 Mock 모드 - 모든 외부 호출이 mock으로 대체됩니다");

    let anchor_mint = Pubkey::from_str(&config.tokens.anchor.mint)
        .context("앵커 민트 파싱 실패")?;
    let config = Arc::new(config);

    let quote: Arc<dyn QuoteService> =
        Arc::new(MockQuoteService::with_edge(anchor_mint, 17_000.0, 0.005));
    let oracle = Arc::new(SolPriceOracle::new(
        vec![Arc::new(MockPriceSource::fixed("mock", 150.0)) as Arc<dyn PriceSource>],
        Arc::clone(&clock),
        config.price.refresh_interval_ms,
    ));
    oracle.refresh().await;

    let sizer = Arc::new(DynamicSizer::new(
        Arc::clone(&config),
        quote,
        Arc::clone(&clock),
        Arc::clone(&cancel),
    ));
    let transport: Arc<dyn ExecutionTransport> = Arc::new(MockTransport::new());
    let swap_builder: Arc<dyn SwapTransactionBuilder> = Arc::new(MockSwapBuilder::new());

    let anchor = xcycle::types::TokenInfo::new(
        anchor_mint,
        config.tokens.anchor.symbol.clone(),
        config.tokens.anchor.decimals,
    );
    let intermediates: Vec<xcycle::types::TokenInfo> = config
        .tokens
        .intermediates
        .iter()
        .map(|entry| {
            Ok(xcycle::types::TokenInfo::new(
                Pubkey::from_str(&entry.mint)
                    .with_context(|| format!("중간 민트 파싱 실패: {}", entry.mint))?,
                entry.symbol.clone(),
                entry.decimals,
            ))
        })
        .collect::<Result<_>>()?;
    let tokens: Arc<dyn TokenDirectory> = Arc::new(mocks::MockTokenDirectory::new(
        anchor,
        intermediates,
        10_000_000_000,
    ));

    Ok(Arc::new(SearchEngine::new(
        config,
        clock,
        oracle,
        sizer,
        transport,
        swap_builder,
        tokens,
        cancel,
    )))
}
