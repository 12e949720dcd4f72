use axum::{
    extract::{Path, Query, State as AxumState},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ridethebus_execution::{GameError, StepOutcome, Transition};
use ridethebus_types::api::{
    AccountRequest, ChoiceQuery, ErrorKind, ErrorResponse, PaymentRequest, PaymentResponse,
    StepResponse, WebhookEvent,
};
use ridethebus_types::game::{GamePhase, Step};
use serde::Serialize;
use std::sync::Arc;

use crate::{webhook, Server};

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
    phase: u8,
    players: usize,
}

/// Error reply carrying the wire error kind.
pub(super) struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error,
                message: message.into(),
            },
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorKind::Unauthorized, "Unauthorized")
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        let status = match err {
            GameError::InvalidPhase { .. } => StatusCode::FORBIDDEN,
            GameError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

fn check_auth(server: &Server, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = server.config.auth_code.as_deref() else {
        return Err(ApiError::unauthorized());
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        return Err(ApiError::unauthorized());
    }
    Ok(())
}

fn parse_card(card: u8) -> Result<Step, ApiError> {
    Step::try_from(card).map_err(|_| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidChoice,
            format!("card must be 1 to 4 (got {card})"),
        )
    })
}

fn payment_response(message: String, payment: PaymentRequest) -> Response {
    Json(PaymentResponse {
        ok: true,
        message,
        payment,
    })
    .into_response()
}

fn step_response(outcome: StepOutcome) -> Response {
    let state = match outcome.transition {
        Transition::Advanced(state) => Some(state),
        _ => None,
    };
    Json(StepResponse {
        ok: true,
        message: outcome.message,
        delta_points: outcome.delta_points,
        card: outcome.card,
        cards: outcome.previous,
        correct: outcome.correct,
        state,
        points: None,
        tier: None,
    })
    .into_response()
}

fn review_response(message: String) -> StepResponse {
    StepResponse {
        ok: true,
        message,
        delta_points: 0,
        card: None,
        cards: Vec::new(),
        correct: None,
        state: None,
        points: None,
        tier: None,
    }
}

pub(super) async fn healthz(AxumState(server): AxumState<Arc<Server>>) -> Response {
    Json(HealthzResponse {
        ok: true,
        phase: server.phase().number(),
        players: server.store().population_size(),
    })
    .into_response()
}

pub(super) async fn register(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let payment = server.register(&request.account).await?;
    let message = format!(
        "Pay {} units to register. Your game unlocks once the payment confirms.",
        payment.amount
    );
    Ok(payment_response(message, payment))
}

async fn play(
    server: Arc<Server>,
    phase: GamePhase,
    step: Step,
    query: ChoiceQuery,
    request: AccountRequest,
) -> ApiResult {
    let choice = query.q.unwrap_or_default();
    let outcome = server
        .play_step(phase, &request.account, step, &choice)
        .await?;
    Ok(step_response(outcome))
}

pub(super) async fn initial_red_black(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Initial, Step::RedBlack, query, request).await
}

pub(super) async fn initial_high_low(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Initial, Step::HighLow, query, request).await
}

pub(super) async fn initial_inside_outside(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Initial, Step::InsideOutside, query, request).await
}

pub(super) async fn initial_suit(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Initial, Step::Suit, query, request).await
}

pub(super) async fn review_initial(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let review = server.review_initial(&request.account).await?;
    Ok(Json(StepResponse {
        cards: review.cards,
        points: Some(review.points),
        ..review_response(review.message)
    })
    .into_response())
}

pub(super) async fn review_card(
    AxumState(server): AxumState<Arc<Server>>,
    Path(card): Path<u8>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let step = parse_card(card)?;
    let drawn = server.review_card(&request.account, step).await?;
    Ok(Json(StepResponse {
        card: Some(drawn),
        ..review_response(format!("Card {card} was {drawn}"))
    })
    .into_response())
}

pub(super) async fn guess(
    AxumState(server): AxumState<Arc<Server>>,
    Path(card): Path<u8>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let step = parse_card(card)?;
    let raw = query.q.unwrap_or_default();
    let value: u32 = raw.trim().parse().map_err(|_| {
        ApiError::from(GameError::InvalidChoice {
            step: "guess",
            choice: raw.clone(),
        })
    })?;
    let outcome = server.submit_guess(&request.account, step, value).await?;
    Ok(Json(StepResponse {
        delta_points: outcome.delta_points,
        card: Some(outcome.card),
        ..review_response(outcome.message)
    })
    .into_response())
}

pub(super) async fn review_points(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let points = server.review_points(&request.account).await?;
    Ok(Json(StepResponse {
        points: Some(points),
        ..review_response(format!("You currently have {points} points."))
    })
    .into_response())
}

pub(super) async fn review_tier(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let review = server.review_tier(&request.account).await?;
    Ok(Json(StepResponse {
        points: Some(review.points),
        tier: Some(review.tier),
        ..review_response(review.message)
    })
    .into_response())
}

pub(super) async fn start_replay(
    AxumState(server): AxumState<Arc<Server>>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let payment = server.start_replay(&request.account).await?;
    let message = format!(
        "Pay {} units to unlock your next attempt.",
        payment.amount
    );
    Ok(payment_response(message, payment))
}

pub(super) async fn replay_red_black(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Replay, Step::RedBlack, query, request).await
}

pub(super) async fn replay_high_low(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Replay, Step::HighLow, query, request).await
}

pub(super) async fn replay_inside_outside(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Replay, Step::InsideOutside, query, request).await
}

pub(super) async fn replay_suit(
    AxumState(server): AxumState<Arc<Server>>,
    Query(query): Query<ChoiceQuery>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    play(server, GamePhase::Replay, Step::Suit, query, request).await
}

pub(super) async fn webhook(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
    Json(events): Json<Vec<WebhookEvent>>,
) -> ApiResult {
    check_auth(&server, &headers)?;
    let summary = webhook::ingest(&server, events).await?;
    Ok(Json(summary).into_response())
}

pub(super) async fn settlement_plan(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
) -> ApiResult {
    check_auth(&server, &headers)?;
    let plan = server.settlement_plan().await;
    Ok(Json(plan).into_response())
}

pub(super) async fn settle(
    AxumState(server): AxumState<Arc<Server>>,
    headers: HeaderMap,
) -> ApiResult {
    check_auth(&server, &headers)?;
    let report = server.settle().await;
    let status = if report.failed() == 0 {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(report)).into_response())
}
