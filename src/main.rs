//! dexswap command-line front end
//!
//! Streams live quotes for a swap pair and, when asked, drives one
//! submission through the wallet and relay pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dexswap::balances::RpcBalanceFetcher;
use dexswap::swap::{RpcDirectSender, SubmitPolicy};
use dexswap::{
    AppConfig, BalanceStore, KeypairSigner, PendingSwap, QuoteRequest, RelayClient, RelayMode,
    SettingsStore, SwapCoordinator, SwapSession, TracingNotifier, WalletSigner,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Input asset mint
    #[arg(long)]
    input_mint: String,

    /// Output asset mint
    #[arg(long)]
    output_mint: String,

    /// Input amount in UI units
    #[arg(long)]
    amount: f64,

    /// Sign and submit the first delivered transaction instead of
    /// just streaming quotes
    #[arg(long)]
    execute: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("🚀 Starting dexswap");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("📋 Loading configuration from: {}", args.config);
    let config = AppConfig::from_file_with_env(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    let settings = SettingsStore::new(&config.settings_path);
    if let Err(e) = settings.load() {
        warn!(error = %e, "could not load persisted settings, using defaults");
    }

    info!("🔑 Loading wallet from: {}", config.wallet.keypair_path);
    let signer = Arc::new(
        KeypairSigner::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?,
    );
    info!("💼 Wallet address: {}", signer.pubkey());

    let balances = Arc::new(BalanceStore::new(Arc::new(RpcBalanceFetcher::new(
        &config.rpc.url,
    ))));
    if let Err(e) = balances.refresh(&signer.pubkey()).await {
        warn!(error = %e, "initial balance fetch failed");
    }
    let snapshot = balances.snapshot();
    let available = if snapshot.is_empty() {
        // Balance unknown, skip the availability check rather than
        // rejecting every amount against an empty snapshot
        None
    } else {
        Some(snapshot.amount(&args.input_mint))
    };

    let http = reqwest::Client::new();
    let priority_fee = settings
        .resolve_effective_fee(&http, &config.fees.tip_floor_url, config.fees.fallback_tip_sol)
        .await;
    info!("💸 Priority fee: {} SOL", priority_fee);

    let request = QuoteRequest::from_inputs(
        &signer.pubkey().to_string(),
        Some(&args.input_mint),
        Some(&args.output_mint),
        args.amount,
        settings.slippage_pct(),
        priority_fee,
        available,
    )
    .context("invalid swap inputs (check mints, amount, and balance)")?;

    let pending = Arc::new(PendingSwap::default());
    let mut session = SwapSession::new(&config.quote.ws_url, Arc::clone(&pending));
    session.request_quote(Some(&request));
    info!("📡 Subscribed to quote stream at {}", config.quote.ws_url);

    while let Some(update) = session.next_update().await {
        if !session.apply(update) {
            continue;
        }
        if let Some(out) = session.expected_out() {
            info!("💱 Expected out: {}", out);
        }
        if args.execute && !pending.is_empty() {
            break;
        }
    }
    session.close();

    if !args.execute {
        return Ok(());
    }
    anyhow::ensure!(
        !pending.is_empty(),
        "quote stream ended without a submittable transaction"
    );

    let mode = if settings.use_bundled_relay() {
        RelayMode::Bundled
    } else {
        RelayMode::Direct
    };
    info!("🎯 Submitting swap ({:?})", mode);

    let coordinator = SwapCoordinator::new(
        signer,
        RelayClient::with_client(http, config.relay.endpoints.clone()),
        Arc::new(RpcDirectSender::new(&config.rpc.url)),
        pending,
        balances,
        Arc::new(TracingNotifier),
        SubmitPolicy::from(&config.relay),
    );
    let outcome = coordinator.execute(mode).await?;
    info!("✅ Swap finished: {:?}", outcome);

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "dexswap=debug,info"
    } else {
        "dexswap=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}
