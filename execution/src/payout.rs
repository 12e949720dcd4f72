//! Stake redistribution across tiers.
//!
//! Middle players get 70% of their stake back, Bottom players nothing. What they
//! forfeit forms the shared pool; the platform keeps 10% of it and the rest is
//! split evenly between Top players on top of their own refunded stake.
//!
//! All figures are smallest token units. Intermediates are `u128` so a large
//! population cannot overflow, and every division floors. The remainder of the
//! per-winner split stays in the treasury and is reported as `undistributed`.

use ridethebus_types::game::{Tier, MIDDLE_REFUND_PERCENT, PLATFORM_FEE_PERCENT};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::Standings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayoutConfigError {
    #[error("middle refund percent must be <= 100 (got {0})")]
    RefundPercent(u8),
    #[error("platform fee percent must be <= 100 (got {0})")]
    FeePercent(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoutConfig {
    pub middle_refund_percent: u8,
    pub platform_fee_percent: u8,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            middle_refund_percent: MIDDLE_REFUND_PERCENT,
            platform_fee_percent: PLATFORM_FEE_PERCENT,
        }
    }
}

impl PayoutConfig {
    pub fn validate(&self) -> Result<(), PayoutConfigError> {
        if self.middle_refund_percent > 100 {
            return Err(PayoutConfigError::RefundPercent(self.middle_refund_percent));
        }
        if self.platform_fee_percent > 100 {
            return Err(PayoutConfigError::FeePercent(self.platform_fee_percent));
        }
        Ok(())
    }
}

/// One player's stake as seen by settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stake {
    pub wallet: String,
    pub points: u32,
    pub staked: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payout {
    pub wallet: String,
    pub tier: Tier,
    pub staked: u64,
    pub amount: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSummary {
    pub payouts: Vec<Payout>,
    pub total_staked: u128,
    pub shared_pool: u128,
    pub platform_fee: u128,
    pub distributable: u128,
    pub per_winner_bonus: u128,
    pub undistributed: u128,
    pub total_paid: u128,
}

fn percent_of(amount: u128, percent: u8) -> u128 {
    amount * u128::from(percent) / 100
}

/// Computes every player's payout for one population snapshot.
///
/// `standings` must have been computed from the same `stakes`.
pub fn compute_payouts(
    stakes: &[Stake],
    standings: &Standings,
    config: &PayoutConfig,
) -> PayoutSummary {
    let mut summary = PayoutSummary::default();
    let mut refunds = Vec::with_capacity(stakes.len());
    for stake in stakes {
        let tier = standings.tier_of(stake.points);
        let staked = u128::from(stake.staked);
        summary.total_staked += staked;
        let refund = match tier {
            Tier::Top => staked,
            Tier::Middle => percent_of(staked, config.middle_refund_percent),
            Tier::Bottom => 0,
        };
        if tier != Tier::Top {
            summary.shared_pool += staked - refund;
        }
        refunds.push((stake, tier, refund));
    }

    summary.platform_fee = percent_of(summary.shared_pool, config.platform_fee_percent);
    summary.distributable = summary.shared_pool - summary.platform_fee;
    let top_count = refunds
        .iter()
        .filter(|(_, tier, _)| *tier == Tier::Top)
        .count() as u128;
    if top_count > 0 {
        summary.per_winner_bonus = summary.distributable / top_count;
    }
    summary.undistributed = summary.distributable - summary.per_winner_bonus * top_count;

    for (stake, tier, refund) in refunds {
        let amount = match tier {
            Tier::Top => refund + summary.per_winner_bonus,
            _ => refund,
        };
        // One transfer carries at most u64::MAX; the excess stays in the
        // treasury and is counted as undistributed.
        let paid = match u64::try_from(amount) {
            Ok(paid) => paid,
            Err(_) => {
                let excess = amount - u128::from(u64::MAX);
                error!(
                    wallet = stake.wallet.as_str(),
                    amount = %amount,
                    excess = %excess,
                    "payout exceeds a single transfer, excess kept in treasury"
                );
                summary.undistributed += excess;
                u64::MAX
            }
        };
        summary.total_paid += u128::from(paid);
        summary.payouts.push(Payout {
            wallet: stake.wallet.clone(),
            tier,
            staked: stake.staked,
            amount: paid,
        });
    }
    summary
}
