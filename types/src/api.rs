//! JSON request/response shapes shared by the service and its clients.

use serde::{Deserialize, Serialize};

use crate::game::{AttemptState, Card, Tier};

/// Body of every player action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

/// Player choice carried in the `q` query parameter.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChoiceQuery {
    pub q: Option<String>,
}

/// Recoverable error kinds reported at the request boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotRegistered,
    AlreadyRegistered,
    UnconfirmedStake,
    OutOfOrder,
    AlreadyPlayed,
    EmptyDeck,
    ExhaustedTerminal,
    InvalidChoice,
    InvalidPhase,
    NotBottomTier,
    Unauthorized,
    Transient,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}

/// Outcome of a step, review, or guess.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub ok: bool,
    pub message: String,
    pub delta_points: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub cards: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state: Option<AttemptState>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tier: Option<Tier>,
}

/// Transfer the player must sign to confirm their stake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: u64,
    pub mint: String,
    pub destination: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub ok: bool,
    pub message: String,
    pub payment: PaymentRequest,
}

/// Payment-confirmation event as delivered by the indexer webhook.
/// Only the fields read by the game are modelled; the rest are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub signature: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub token_transfers: Vec<TokenTransfer>,
}

impl WebhookEvent {
    pub fn is_transfer(&self) -> bool {
        self.kind == "TRANSFER"
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub mint: String,
    #[serde(default)]
    pub from_token_account: String,
    pub from_user_account: String,
    pub to_token_account: String,
    #[serde(default)]
    pub to_user_account: String,
    /// Amount in whole-token (UI) units.
    pub token_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_event_parses_indexer_payload() {
        let raw = r#"[{
            "signature": "5abc",
            "type": "TRANSFER",
            "slot": 12,
            "fee": 5000,
            "tokenTransfers": [{
                "fromTokenAccount": "src-ata",
                "fromUserAccount": "player",
                "mint": "mint",
                "toTokenAccount": "treasury-ata",
                "toUserAccount": "server",
                "tokenAmount": 500,
                "tokenStandard": "Fungible"
            }]
        }]"#;
        let events: Vec<WebhookEvent> = serde_json::from_str(raw).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_transfer());
        assert_eq!(events[0].token_transfers[0].from_user_account, "player");
        assert_eq!(events[0].token_transfers[0].token_amount, 500.0);
    }

    #[test]
    fn test_error_response_uses_kind_names() {
        let response = ErrorResponse {
            error: ErrorKind::UnconfirmedStake,
            message: "pay first".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "UnconfirmedStake");
    }

    #[test]
    fn test_step_response_omits_empty_fields() {
        let response = StepResponse {
            ok: true,
            message: "done".to_string(),
            delta_points: 1,
            card: None,
            cards: Vec::new(),
            correct: None,
            state: None,
            points: None,
            tier: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "ok": true, "message": "done", "deltaPoints": 1 })
        );
    }
}
