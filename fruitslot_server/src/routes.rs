use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fruitslot_core::{EngineParams, EntropyRng, LedgerError, RandomSource, SessionToken};
use fruitslot_shared::{ApiError, CashOutResponse, RollResponse, SessionResponse};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::store::{SessionStore, StoreError};

/// Builds a fresh generator for each spin request.
pub type RngFactory = Arc<dyn Fn() -> Box<dyn RandomSource + Send> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub params: EngineParams,
    pub rng: RngFactory,
}

impl AppState {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            params: EngineParams::default(),
            rng: Arc::new(|| -> Box<dyn RandomSource + Send> { Box::new(EntropyRng::new()) }),
        }
    }

    pub fn with_rng(mut self, rng: RngFactory) -> Self {
        self.rng = rng;
        self
    }
}

/// [`ApiError`] as an HTTP response.
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::CashedOut | ApiError::InsufficientCredits | ApiError::AlreadyCashedOut => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self.0.body())).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

fn internal(e: StoreError) -> ApiError {
    error!(error = %e, "store failure");
    ApiError::Internal
}

fn lookup_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => ApiError::NotFound,
        e => internal(e),
    }
}

fn spin_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Ledger(LedgerError::AlreadyCashedOut) => ApiError::CashedOut,
        StoreError::Ledger(LedgerError::InsufficientCredits) => ApiError::InsufficientCredits,
        e => lookup_error(e),
    }
}

fn cash_out_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Ledger(LedgerError::AlreadyCashedOut) => ApiError::AlreadyCashedOut,
        e => lookup_error(e),
    }
}

// Anything that is not a well-formed token cannot name a session.
fn parse_token(raw: &str) -> Result<SessionToken, HttpError> {
    raw.parse().map_err(|_| HttpError(ApiError::NotFound))
}

async fn route_health() -> StatusCode {
    StatusCode::OK
}

async fn route_create(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionResponse>), HttpError> {
    let session = state.store.create().await.map_err(internal)?;
    info!(token = %session.token(), credits = session.credits(), "session opened");
    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))))
}

async fn route_show(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<SessionResponse>, HttpError> {
    let token = parse_token(&token)?;
    let session = state
        .store
        .get(&token)
        .await
        .map_err(internal)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(SessionResponse::from(&session)))
}

async fn route_roll(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<RollResponse>, HttpError> {
    let token = parse_token(&token)?;
    let mut rng = (state.rng)();
    let (session, outcome) = state
        .store
        .spin(&token, &state.params, rng.as_mut())
        .await
        .map_err(spin_error)?;
    info!(
        token = %token,
        win = outcome.is_win,
        reward = outcome.reward,
        rerolled = outcome.rerolled,
        credits = session.credits(),
        "spin"
    );
    Ok(Json(RollResponse::new(&outcome, session.credits())))
}

async fn route_cash_out(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<CashOutResponse>, HttpError> {
    let token = parse_token(&token)?;
    let (session, receipt) = state
        .store
        .cash_out(&token)
        .await
        .map_err(cash_out_error)?;
    info!(token = %token, credits = receipt.credits_cashed, "cashed out");
    Ok(Json(CashOutResponse::new(
        receipt.credits_cashed,
        session.token().clone(),
    )))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/up", get(route_health))
        .route("/api/v1/game_sessions", post(route_create))
        .route("/api/v1/game_sessions/{session_token}", get(route_show))
        .route("/api/v1/game_sessions/{session_token}/roll", post(route_roll))
        .route(
            "/api/v1/game_sessions/{session_token}/cash_out",
            post(route_cash_out),
        )
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
