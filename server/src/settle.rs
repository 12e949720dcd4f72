//! Runs a settlement plan through a broadcaster.

use ridethebus_execution::SettlementPlan;
use serde::Serialize;
use tracing::{error, info};

use crate::broadcast::Broadcaster;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchStatus {
    Broadcast { id: String },
    Failed { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub index: usize,
    pub transfers: usize,
    pub size: usize,
    pub oversized: bool,
    #[serde(flatten)]
    pub status: BatchStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SettlementReport {
    pub plan: SettlementPlan,
    pub batches: Vec<BatchReport>,
}

impl SettlementReport {
    pub fn failed(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b.status, BatchStatus::Failed { .. }))
            .count()
    }
}

/// Broadcasts every batch in order. A failed batch is reported and the run
/// moves on; nothing is retried.
pub async fn run_settlement(
    plan: SettlementPlan,
    token_mint: &str,
    broadcaster: &dyn Broadcaster,
) -> SettlementReport {
    let mut reports = Vec::with_capacity(plan.batches.len());
    for (index, batch) in plan.batches.iter().enumerate() {
        let status = match broadcaster.broadcast(token_mint, batch).await {
            Ok(id) => {
                info!(index, transfers = batch.len(), id = id.as_str(), "batch broadcast");
                BatchStatus::Broadcast { id }
            }
            Err(err) => {
                error!(index, transfers = batch.len(), "batch broadcast failed: {err}");
                BatchStatus::Failed {
                    error: err.to_string(),
                }
            }
        };
        reports.push(BatchReport {
            index,
            transfers: batch.len(),
            size: batch.size,
            oversized: batch.oversized,
            status,
        });
    }
    let report = SettlementReport {
        plan,
        batches: reports,
    };
    info!(
        batches = report.batches.len(),
        failed = report.failed(),
        "settlement run finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{BroadcastError, DryRunBroadcaster};
    use futures::future::BoxFuture;
    use ridethebus_execution::batcher::Batch;
    use ridethebus_execution::payout::Stake;
    use ridethebus_execution::{plan_settlement, SettlementConfig, TransferOperation};

    struct FailSecond;

    impl Broadcaster for FailSecond {
        fn broadcast<'a>(
            &'a self,
            _token_mint: &'a str,
            batch: &'a Batch<TransferOperation>,
        ) -> BoxFuture<'a, Result<String, BroadcastError>> {
            Box::pin(async move {
                if batch.len() == 1 {
                    Err(BroadcastError::Rejected("boom".to_string()))
                } else {
                    Ok("ok".to_string())
                }
            })
        }
    }

    fn seven_winners() -> SettlementPlan {
        let stakes: Vec<Stake> = (0..7)
            .map(|i| Stake {
                wallet: format!("w{i}"),
                points: 1,
                staked: 10,
            })
            .collect();
        plan_settlement(&stakes, &SettlementConfig::default())
    }

    #[tokio::test]
    async fn test_dry_run_reports_every_batch() {
        let broadcaster = DryRunBroadcaster::default();
        let report = run_settlement(seven_winners(), "mint", &broadcaster).await;
        assert_eq!(report.batches.len(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(broadcaster.sent(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_run() {
        let report = run_settlement(seven_winners(), "mint", &FailSecond).await;
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.batches[0].status,
            BatchStatus::Broadcast {
                id: "ok".to_string()
            }
        );
        let json = serde_json::to_value(&report.batches[1]).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["transfers"], 1);
    }
}
