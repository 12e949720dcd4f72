//! Offline settlement from a wallet database.
//!
//! Prints the settlement plan as JSON. With `--execute` the batches are also
//! sent (through the relay when one is given, otherwise as a dry run) and the
//! per-batch report is printed instead. Stop the server first so the database
//! is not changing underneath the snapshot.

use anyhow::{Context, Result};
use clap::Parser;
use ridethebus_execution::payout::{PayoutConfig, Stake};
use ridethebus_execution::{plan_settlement, SettlementConfig};
use ridethebus_server::persistence::load_snapshot;
use ridethebus_server::{run_settlement, Broadcaster, DryRunBroadcaster, HttpBroadcaster};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan or run end-of-game settlement", long_about = None)]
struct Args {
    /// SQLite database written by the server.
    #[arg(long, env = "PERSISTENCE_PATH")]
    db: PathBuf,

    #[arg(long, env = "TOKEN_MINT")]
    token_mint: String,

    /// Relay URL that signs and sends payout batches.
    #[arg(long, env = "RELAY_URL")]
    relay_url: Option<String>,

    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Percent of stake refunded to middle players.
    #[arg(long, default_value_t = PayoutConfig::default().middle_refund_percent)]
    middle_refund_percent: u8,

    /// Percent of the shared pool kept as platform fee.
    #[arg(long, default_value_t = PayoutConfig::default().platform_fee_percent)]
    platform_fee_percent: u8,

    /// Broadcast the batches instead of only printing the plan.
    #[arg(long, default_value_t = false)]
    execute: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let payout = PayoutConfig {
        middle_refund_percent: args.middle_refund_percent,
        platform_fee_percent: args.platform_fee_percent,
    };
    payout.validate().context("invalid payout config")?;
    let config = SettlementConfig {
        payout,
        ..SettlementConfig::default()
    };

    let snapshot = load_snapshot(&args.db)
        .with_context(|| format!("load wallets from {}", args.db.display()))?;
    let unsettled = snapshot
        .records
        .iter()
        .filter(|record| !record.pending.is_settled())
        .count();
    info!(
        wallets = snapshot.records.len(),
        unsettled, "snapshot loaded"
    );
    let stakes: Vec<Stake> = snapshot
        .records
        .iter()
        .map(ridethebus_server::stake_of)
        .collect();
    let plan = plan_settlement(&stakes, &config);

    if !args.execute {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let broadcaster: Box<dyn Broadcaster> = match &args.relay_url {
        Some(url) => Box::new(
            HttpBroadcaster::new(url.clone(), Duration::from_secs(args.timeout_secs.max(1)))
                .context("build relay client")?,
        ),
        None => Box::new(DryRunBroadcaster::default()),
    };
    let report = run_settlement(plan, &args.token_mint, broadcaster.as_ref()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.failed() > 0 {
        anyhow::bail!("{} batch(es) failed", report.failed());
    }
    Ok(())
}
