use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::Server;

mod http;

pub struct Api {
    server: Arc<Server>,
}

impl Api {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub fn router(&self) -> Router {
        let allowed_origins = &self.server.config.allowed_origins;
        let allow_any_origin = allowed_origins.iter().any(|origin| origin == "*");
        if allowed_origins.is_empty() {
            tracing::warn!("no allowed origins configured; all browser origins will be rejected");
        }
        let cors_origins = allowed_origins
            .iter()
            .filter(|origin| *origin != "*")
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Invalid allowed origin: {}", origin);
                    None
                }
            })
            .collect::<Vec<_>>();

        // Configure CORS
        let cors = if allow_any_origin {
            CorsLayer::new().allow_origin(AllowOrigin::any())
        } else {
            CorsLayer::new().allow_origin(AllowOrigin::list(cors_origins))
        }
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([header::HeaderName::from_static("x-request-id")]);

        let router = Router::new()
            .route("/healthz", get(http::healthz))
            .route("/1/register", post(http::register))
            .route("/1/redblack", post(http::initial_red_black))
            .route("/1/highlow", post(http::initial_high_low))
            .route("/1/insideoutside", post(http::initial_inside_outside))
            .route("/1/suit", post(http::initial_suit))
            .route("/1/review", post(http::review_initial))
            .route("/2/review", post(http::review_points))
            .route("/2/:card/review", post(http::review_card))
            .route("/2/:card/guess", post(http::guess))
            .route("/3/review", post(http::review_tier))
            .route("/3/start", post(http::start_replay))
            .route("/3/redblack", post(http::replay_red_black))
            .route("/3/highlow", post(http::replay_high_low))
            .route("/3/insideoutside", post(http::replay_inside_outside))
            .route("/3/suit", post(http::replay_suit))
            .route("/webhook", post(http::webhook))
            .route("/admin/settlement", get(http::settlement_plan))
            .route("/admin/settle", post(http::settle));

        let router = router.layer(cors);
        let router = router.layer(middleware::from_fn(request_id_middleware));
        let router = router.layer(TraceLayer::new_for_http());

        router.with_state(self.server.clone())
    }
}

async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(header::HeaderName::from_static("x-request-id"))
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let mut response = next.run(req).await;
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(
            header::HeaderName::from_static("x-request-id"),
            header_value,
        );
    }
    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "http.request"
    );
    response
}
