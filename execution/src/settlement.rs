//! End-of-game settlement planning: tiering, payouts and batching over one
//! population snapshot.

use ridethebus_types::game::{BATCH_CEILING_BYTES, TRANSFER_OPERATION_SIZE};
use serde::Serialize;
use tracing::{info, warn};

use crate::batcher::{self, Batch, SerializedSize};
use crate::payout::{self, PayoutConfig, PayoutSummary, Stake};
use crate::Standings;

/// One token transfer from the treasury to a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferOperation {
    pub wallet: String,
    pub amount: u64,
}

impl SerializedSize for TransferOperation {
    fn serialized_size(&self) -> usize {
        TRANSFER_OPERATION_SIZE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementConfig {
    pub payout: PayoutConfig,
    pub batch_ceiling: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            payout: PayoutConfig::default(),
            batch_ceiling: BATCH_CEILING_BYTES,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementPlan {
    pub standings: Option<Standings>,
    pub summary: PayoutSummary,
    pub batches: Vec<Batch<TransferOperation>>,
}

impl SettlementPlan {
    pub fn transfer_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

/// Builds the settlement plan for `stakes`. An empty population yields an
/// empty plan.
pub fn plan_settlement(stakes: &[Stake], config: &SettlementConfig) -> SettlementPlan {
    let Some(standings) = Standings::from_points(stakes.iter().map(|s| s.points)) else {
        info!("no players, nothing to settle");
        return SettlementPlan {
            standings: None,
            summary: PayoutSummary::default(),
            batches: Vec::new(),
        };
    };

    let summary = payout::compute_payouts(stakes, &standings, &config.payout);
    let transfers: Vec<TransferOperation> = summary
        .payouts
        .iter()
        .filter(|p| p.amount > 0)
        .map(|p| TransferOperation {
            wallet: p.wallet.clone(),
            amount: p.amount,
        })
        .collect();
    let batches = batcher::pack(transfers, config.batch_ceiling);

    info!(
        players = standings.population(),
        top = standings.top_count,
        middle = standings.middle_count,
        bottom = standings.bottom_count,
        pool = %summary.shared_pool,
        fee = %summary.platform_fee,
        bonus = %summary.per_winner_bonus,
        batches = batches.len(),
        "settlement planned"
    );
    if summary.undistributed > 0 {
        warn!(
            undistributed = %summary.undistributed,
            "bonus remainder stays in treasury"
        );
    }

    SettlementPlan {
        standings: Some(standings),
        summary,
        batches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stake(wallet: &str, points: u32, staked: u64) -> Stake {
        Stake {
            wallet: wallet.to_string(),
            points,
            staked,
        }
    }

    #[test]
    fn test_empty_population() {
        let plan = plan_settlement(&[], &SettlementConfig::default());
        assert_eq!(plan.standings, None);
        assert!(plan.batches.is_empty());
    }

    #[test]
    fn test_zero_payouts_are_not_transferred() {
        let stakes = vec![stake("top", 4, 100), stake("low", 0, 100)];
        let plan = plan_settlement(&stakes, &SettlementConfig::default());
        assert_eq!(plan.transfer_count(), 1);
        assert_eq!(plan.batches[0].operations[0].wallet, "top");
        assert_eq!(plan.batches[0].operations[0].amount, 190);
    }

    #[test]
    fn test_transfers_batched_under_ceiling() {
        let stakes: Vec<Stake> = (0..7).map(|i| stake(&format!("w{i}"), 1, 10)).collect();
        let plan = plan_settlement(&stakes, &SettlementConfig::default());
        let lens: Vec<usize> = plan.batches.iter().map(Batch::len).collect();
        assert_eq!(lens, vec![6, 1]);
        assert_eq!(plan.transfer_count(), 7);
    }
}
