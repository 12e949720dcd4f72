use std::path::PathBuf;
use std::time::Duration;

use ridethebus_execution::{GameRules, SettlementConfig};
use ridethebus_types::game::GamePhase;

pub const DEFAULT_PERSISTENCE_BUFFER: usize = 1_000;
pub const DEFAULT_BROADCAST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Phase accepting player actions. Everything else answers `InvalidPhase`.
    pub phase: GamePhase,
    /// Shared secret for the webhook and admin routes. Unset rejects them all.
    pub auth_code: Option<String>,
    /// Mint of the staking token.
    pub token_mint: String,
    /// Wallet that players pay their stake to.
    pub treasury_wallet: String,
    /// Token account of the treasury wallet, matched against incoming transfers.
    pub treasury_token_account: String,
    pub rules: GameRules,
    pub settlement: SettlementConfig,
    /// SQLite database for wallet records (memory only when unset).
    pub persistence_path: Option<PathBuf>,
    pub persistence_buffer: usize,
    /// Relay that signs and sends payout batches (dry run when unset).
    pub relay_url: Option<String>,
    pub broadcast_timeout: Duration,
    /// Browser origins allowed by CORS; `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            phase: GamePhase::Closed,
            auth_code: None,
            token_mint: String::new(),
            treasury_wallet: String::new(),
            treasury_token_account: String::new(),
            rules: GameRules::default(),
            settlement: SettlementConfig::default(),
            persistence_path: None,
            persistence_buffer: DEFAULT_PERSISTENCE_BUFFER,
            relay_url: None,
            broadcast_timeout: DEFAULT_BROADCAST_TIMEOUT,
            allowed_origins: Vec::new(),
        }
    }
}
