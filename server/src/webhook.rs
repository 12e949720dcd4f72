//! Payment confirmations from the chain indexer.

use ridethebus_execution::GameError;
use ridethebus_types::api::WebhookEvent;
use ridethebus_types::game::TOKEN_UNIT;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{PaymentOutcome, Server};

#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("invalid token amount: {0}")]
    Invalid(f64),
}

/// Converts a whole-token amount into smallest units.
pub fn normalize_amount(amount: f64) -> Result<u64, AmountError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AmountError::Invalid(amount));
    }
    let units = (amount * TOKEN_UNIT as f64).round();
    if units < 1.0 || units >= u64::MAX as f64 {
        return Err(AmountError::Invalid(amount));
    }
    Ok(units as u64)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSummary {
    pub credited: usize,
    pub duplicates: usize,
    pub ignored: usize,
}

/// Credits every matching transfer to its sender.
///
/// Each event is applied as a unit and its signature is processed at most
/// once. Transfers for another mint or another destination, and transfers
/// from unknown wallets, are skipped. When storage is unavailable nothing from
/// the failing event is applied and the error is returned, so the indexer's
/// redelivery is processed in full.
pub async fn ingest(
    server: &Server,
    events: Vec<WebhookEvent>,
) -> Result<WebhookSummary, GameError> {
    let config = &server.config;
    let mut summary = WebhookSummary::default();
    for event in events {
        if !event.is_transfer() {
            summary.ignored += 1;
            continue;
        }
        let signature = event.signature.as_str();
        let mut credits = Vec::with_capacity(event.token_transfers.len());
        let mut skipped = 0;
        for transfer in &event.token_transfers {
            if transfer.mint != config.token_mint
                || transfer.to_token_account != config.treasury_token_account
            {
                skipped += 1;
                continue;
            }
            match normalize_amount(transfer.token_amount) {
                Ok(amount) => credits.push((transfer.from_user_account.clone(), amount)),
                Err(err) => {
                    warn!(signature, "{err}");
                    skipped += 1;
                }
            }
        }

        match server.store().credit_payment(signature, credits).await? {
            PaymentOutcome::Duplicate => {
                debug!(signature, "duplicate payment event");
                summary.duplicates += 1;
            }
            PaymentOutcome::Applied { credited, unknown } => {
                for credit in &credited {
                    info!(
                        wallet = credit.wallet.as_str(),
                        amount = credit.amount,
                        pending = credit.pending,
                        signature,
                        "stake confirmed"
                    );
                }
                for wallet in &unknown {
                    warn!(wallet = wallet.as_str(), signature, "payment from unregistered wallet");
                }
                summary.credited += credited.len();
                summary.ignored += skipped + unknown.len();
            }
        }
    }
    Ok(summary)
}
