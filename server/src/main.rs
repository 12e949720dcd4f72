use anyhow::{Context, Result};
use clap::Parser;
use ridethebus_server::{
    Api, Broadcaster, DryRunBroadcaster, HttpBroadcaster, RecordPersistence, Server,
    ServerConfig, Snapshot, Store,
};
use ridethebus_types::game::GamePhase;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Active game phase: 0 (closed), 1, 2 or 3.
    #[arg(long, env = "PHASE", default_value_t = 0)]
    phase: u8,

    /// Shared secret expected in the Authorization header of webhook and admin calls.
    #[arg(long, env = "SERVER_AUTH_CODE")]
    auth_code: Option<String>,

    /// Mint of the staking token.
    #[arg(long, env = "TOKEN_MINT")]
    token_mint: String,

    /// Wallet that receives stakes.
    #[arg(long, env = "TREASURY_WALLET")]
    treasury_wallet: String,

    /// Token account of the treasury wallet.
    #[arg(long, env = "TREASURY_TOKEN_ACCOUNT")]
    treasury_token_account: String,

    /// Path to SQLite database for wallet records (memory only when omitted).
    #[arg(long, env = "PERSISTENCE_PATH")]
    persistence_path: Option<PathBuf>,

    /// Max queued persistence writes (0 uses default).
    #[arg(long)]
    persistence_buffer: Option<usize>,

    /// Relay URL that signs and sends payout batches (dry run when omitted).
    #[arg(long, env = "RELAY_URL")]
    relay_url: Option<String>,

    /// Relay request timeout in seconds (must be > 0 when set).
    #[arg(long)]
    broadcast_timeout_secs: Option<u64>,

    /// Comma-separated browser origins allowed by CORS (`*` for any).
    #[arg(long, env = "ALLOWED_HTTP_ORIGINS", value_delimiter = ',')]
    allowed_origins: Vec<String>,
}

fn build_config(args: &Args) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();
    let phase = GamePhase::try_from(args.phase)
        .map_err(|err| anyhow::anyhow!("invalid phase: {err}"))?;
    if let Some(0) = args.broadcast_timeout_secs {
        anyhow::bail!("broadcast_timeout_secs must be > 0 when set");
    }
    let auth_code = args
        .auth_code
        .as_ref()
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());
    if auth_code.is_none() {
        tracing::warn!("SERVER_AUTH_CODE unset; webhook and admin routes will reject every call");
    }

    Ok(ServerConfig {
        phase,
        auth_code,
        token_mint: args.token_mint.clone(),
        treasury_wallet: args.treasury_wallet.clone(),
        treasury_token_account: args.treasury_token_account.clone(),
        persistence_path: args.persistence_path.clone(),
        persistence_buffer: match args.persistence_buffer {
            Some(0) | None => defaults.persistence_buffer,
            Some(value) => value,
        },
        relay_url: args.relay_url.clone(),
        broadcast_timeout: args
            .broadcast_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.broadcast_timeout),
        allowed_origins: args
            .allowed_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect(),
        ..defaults
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<&'static str> {
        vec![
            "ridethebus-server",
            "--token-mint",
            "mint",
            "--treasury-wallet",
            "treasury",
            "--treasury-token-account",
            "treasury-ata",
        ]
    }

    #[test]
    fn parses_phase_and_origins() {
        let mut argv = base_args();
        argv.extend(["--phase", "3", "--allowed-origins", "https://a.xyz, https://b.xyz"]);
        let args = Args::parse_from(argv);
        let config = build_config(&args).expect("config should parse");
        assert_eq!(config.phase, GamePhase::Replay);
        assert_eq!(config.allowed_origins, vec!["https://a.xyz", "https://b.xyz"]);
    }

    #[test]
    fn rejects_unknown_phase() {
        let mut argv = base_args();
        argv.extend(["--phase", "4"]);
        let args = Args::parse_from(argv);
        let err = build_config(&args).unwrap_err();
        assert!(err.to_string().contains("invalid phase"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut argv = base_args();
        argv.extend(["--broadcast-timeout-secs", "0"]);
        let args = Args::parse_from(argv);
        let err = build_config(&args).unwrap_err();
        assert!(
            err.to_string().contains("broadcast_timeout_secs"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn blank_auth_code_is_unset() {
        let mut argv = base_args();
        argv.extend(["--auth-code", "  "]);
        let args = Args::parse_from(argv);
        let config = build_config(&args).unwrap();
        assert_eq!(config.auth_code, None);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing();

    let config = build_config(&args)?;
    info!(phase = %config.phase, "configuration loaded");

    let (persistence, snapshot) = if let Some(path) = &config.persistence_path {
        let (persistence, snapshot) =
            RecordPersistence::load_and_start_sqlite(path, config.persistence_buffer)
                .context("load and start record persistence")?;
        info!(
            path = %path.display(),
            wallets = snapshot.records.len(),
            signatures = snapshot.signatures.len(),
            "Record persistence enabled"
        );
        (Some(persistence), snapshot)
    } else {
        (None, Snapshot::default())
    };
    let store = Store::new(snapshot.records, snapshot.signatures, persistence);

    let broadcaster: Arc<dyn Broadcaster> = match &config.relay_url {
        Some(url) => {
            info!(url = url.as_str(), "payouts go through relay");
            Arc::new(
                HttpBroadcaster::new(url.clone(), config.broadcast_timeout)
                    .context("build relay client")?,
            )
        }
        None => {
            info!("no relay configured; settlement runs dry");
            Arc::new(DryRunBroadcaster::default())
        }
    };

    let server = Arc::new(Server::new(config, store, broadcaster));
    let api = Api::new(server);
    let app = api.router();

    // Start server
    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
