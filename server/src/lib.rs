use std::sync::Arc;

use ridethebus_execution::guess::{self, GuessOutcome};
use ridethebus_execution::phase::{InitialReview, TierReview};
use ridethebus_execution::step::Choice;
use ridethebus_execution::{deck, plan_settlement, GameError, PhaseMachine, SettlementPlan, StepOutcome};
use ridethebus_types::api::PaymentRequest;
use ridethebus_types::game::{Card, GamePhase, Step};
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

mod api;
pub use api::Api;

pub mod broadcast;
pub use broadcast::{Broadcaster, DryRunBroadcaster, HttpBroadcaster};
mod config;
pub use config::{ServerConfig, DEFAULT_BROADCAST_TIMEOUT, DEFAULT_PERSISTENCE_BUFFER};
pub mod persistence;
pub use persistence::{RecordPersistence, Snapshot};
pub mod settle;
pub use settle::{run_settlement, SettlementReport};
mod store;
pub use store::{stake_of, Credit, PaymentOutcome, Population, Store};
pub mod webhook;

/// Game service: the phase machine in front of the wallet store.
pub struct Server {
    pub config: ServerConfig,
    machine: PhaseMachine,
    store: Store,
    broadcaster: Arc<dyn Broadcaster>,
    settling: AsyncMutex<()>,
}

impl Server {
    pub fn new(config: ServerConfig, store: Store, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            machine: PhaseMachine::new(config.rules),
            config,
            store,
            broadcaster,
            settling: AsyncMutex::new(()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn phase(&self) -> GamePhase {
        self.config.phase
    }

    fn payment(&self, amount: u64) -> PaymentRequest {
        PaymentRequest {
            amount,
            mint: self.config.token_mint.clone(),
            destination: self.config.treasury_wallet.clone(),
        }
    }

    pub async fn register(&self, wallet: &str) -> Result<PaymentRequest, GameError> {
        let active = self.phase();
        PhaseMachine::require_phase(active, GamePhase::Initial)?;
        let seed = deck::new_deck_seed(&mut rand::thread_rng());
        let amount = self
            .store
            .upsert(wallet, |slot, _| {
                let record = self.machine.register(active, slot.as_ref(), wallet, seed)?;
                let amount = record.pending.pending_amount;
                *slot = Some(record);
                Ok::<_, GameError>(amount)
            })
            .await?;
        info!(wallet, amount, "player registered");
        Ok(self.payment(amount))
    }

    /// Plays one step of the attempt running in `phase`. `raw_choice` is the
    /// unparsed `q` value.
    pub async fn play_step(
        &self,
        phase: GamePhase,
        wallet: &str,
        step: Step,
        raw_choice: &str,
    ) -> Result<StepOutcome, GameError> {
        let active = self.phase();
        PhaseMachine::require_phase(active, phase)?;
        let choice = Choice::parse(step, raw_choice)?;
        self.store
            .update(wallet, |record, _| {
                self.machine
                    .play_step(active, phase, record.as_mut(), step, choice)
            })
            .await
    }

    pub async fn review_initial(&self, wallet: &str) -> Result<InitialReview, GameError> {
        let active = self.phase();
        self.store
            .read(wallet, |record, _| self.machine.review_initial(active, record))
            .await
    }

    pub async fn start_replay(&self, wallet: &str) -> Result<PaymentRequest, GameError> {
        let active = self.phase();
        let amount = self
            .store
            .update(wallet, |record, population| {
                let standings = population.standings();
                self.machine
                    .start_replay(active, record.as_mut(), standings.as_ref())
            })
            .await?;
        info!(wallet, amount, "replay attempt started");
        Ok(self.payment(amount))
    }

    pub async fn review_tier(&self, wallet: &str) -> Result<TierReview, GameError> {
        let active = self.phase();
        self.store
            .read(wallet, |record, population| {
                let standings = population.standings();
                self.machine.review_tier(active, record, standings.as_ref())
            })
            .await
    }

    pub async fn submit_guess(
        &self,
        wallet: &str,
        step: Step,
        value: u32,
    ) -> Result<GuessOutcome, GameError> {
        let active = self.phase();
        self.store
            .update(wallet, |record, population| {
                guess::submit_guess(active, record.as_mut(), step, value, population.census())
            })
            .await
    }

    pub async fn review_card(&self, wallet: &str, step: Step) -> Result<Card, GameError> {
        let active = self.phase();
        self.store
            .read(wallet, |record, _| guess::review_card(active, record, step))
            .await
    }

    pub async fn review_points(&self, wallet: &str) -> Result<u32, GameError> {
        let active = self.phase();
        self.store
            .read(wallet, |record, _| guess::review_points(active, record))
            .await
    }

    /// Plans settlement over a frozen snapshot of every wallet.
    pub async fn settlement_plan(&self) -> SettlementPlan {
        let _frozen = self.store.freeze().await;
        let stakes = self.store.stakes().await;
        plan_settlement(&stakes, &self.config.settlement)
    }

    /// Plans and broadcasts settlement. Player actions wait until the run ends.
    pub async fn settle(&self) -> SettlementReport {
        let _running = self.settling.lock().await;
        let _frozen = self.store.freeze().await;
        let stakes = self.store.stakes().await;
        let plan = plan_settlement(&stakes, &self.config.settlement);
        run_settlement(plan, &self.config.token_mint, self.broadcaster.as_ref()).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{test_config, test_server};
    use super::*;
    use ridethebus_types::game::{WalletRecord, REGISTRATION_COST};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_register_returns_payment_request() {
        let server = test_server();
        let payment = server.register("alice").await.unwrap();
        assert_eq!(payment.amount, REGISTRATION_COST);
        assert_eq!(payment.destination, "treasury");
        assert_eq!(
            server.register("alice").await.unwrap_err(),
            GameError::AlreadyRegistered
        );
    }

    #[tokio::test]
    async fn test_step_blocked_until_paid() {
        let server = test_server();
        server.register("alice").await.unwrap();
        let err = server
            .play_step(GamePhase::Initial, "alice", Step::RedBlack, "RED")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::UnconfirmedStake { .. }));
    }

    #[tokio::test]
    async fn test_wrong_phase_checked_first() {
        let server = test_server();
        let err = server
            .play_step(GamePhase::Replay, "nobody", Step::RedBlack, "nonsense")
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn test_settle_dry_run() {
        let mut winner = WalletRecord::new("alice", 1, 0);
        winner.player.points = 3;
        winner.player.staked = 100;
        let mut loser = WalletRecord::new("bob", 2, 0);
        loser.player.staked = 100;
        let store = Store::new(vec![winner, loser], HashSet::new(), None);
        let broadcaster = Arc::new(DryRunBroadcaster::default());
        let server = Server::new(
            ServerConfig {
                phase: GamePhase::Closed,
                ..test_config()
            },
            store,
            broadcaster.clone(),
        );

        let plan = server.settlement_plan().await;
        assert_eq!(plan.transfer_count(), 1);
        let report = server.settle().await;
        assert_eq!(report.batches.len(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(broadcaster.sent(), 1);
        assert_eq!(report.plan.batches[0].operations[0].amount, 190);
    }
}
