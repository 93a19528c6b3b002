//! Ledger HTTP API: wallet management plus the DLQ admin surface.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use utoipa::ToSchema;

use super::db::WalletDb;
use super::dlq::{DeadLetter, DeadLetterStatus, DeadLetterStore, ReplayOutcome, ReplayService};
use super::error::LedgerError;
use super::models::Wallet;
use crate::core_types::{Amount, DeadLetterId, WalletId};

pub struct AppState {
    pub wallets: Arc<WalletDb>,
    pub dlq: Arc<DeadLetterStore>,
    pub replay: Arc<ReplayService>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_PARAMETER",
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        Self {
            status: StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorBody {
            code: self.code.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateWalletRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletProjection {
    #[schema(value_type = uuid::Uuid)]
    pub wallet_id: WalletId,
    pub user_id: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

impl From<Wallet> for WalletProjection {
    fn from(w: Wallet) -> Self {
        Self {
            wallet_id: w.wallet_id,
            user_id: w.user_id,
            balance: w.balance,
            created_at: w.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterProjection {
    #[schema(value_type = uuid::Uuid)]
    pub id: DeadLetterId,
    pub original_topic: String,
    #[schema(value_type = Object)]
    pub original_payload: serde_json::Value,
    pub error_message: String,
    pub attempt_count: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<DeadLetter> for DeadLetterProjection {
    fn from(d: DeadLetter) -> Self {
        Self {
            id: d.id,
            original_topic: d.original_topic,
            original_payload: d.original_payload,
            error_message: d.error_message,
            attempt_count: d.attempt_count,
            status: d.status.as_str().to_string(),
            created_at: d.created_at,
            processed_at: d.processed_at,
        }
    }
}

/// Create wallet endpoint
///
/// POST /wallets
#[utoipa::path(
    post,
    path = "/wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletProjection),
        (status = 400, description = "Invalid parameters", body = ErrorBody),
        (status = 409, description = "User already has a wallet", body = ErrorBody)
    ),
    tag = "Wallet"
)]
pub async fn create_wallet(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<WalletProjection>), ApiError> {
    let req: CreateWalletRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;

    if req.user_id.is_empty() {
        return Err(ApiError::bad_request("userId must not be empty"));
    }

    let wallet = state.wallets.create_wallet(&req.user_id).await?;
    Ok((StatusCode::CREATED, Json(wallet.into())))
}

/// Get wallet endpoint
///
/// GET /wallets/{id}
#[utoipa::path(
    get,
    path = "/wallets/{id}",
    params(("id" = String, Path, description = "Wallet id (UUID)")),
    responses(
        (status = 200, description = "Wallet projection", body = WalletProjection),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Wallet not found", body = ErrorBody)
    ),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalletProjection>, ApiError> {
    let wallet_id: WalletId = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid wallet id format"))?;

    let wallet = state
        .wallets
        .get_wallet(wallet_id)
        .await?
        .ok_or(LedgerError::WalletNotFound(wallet_id))?;

    Ok(Json(wallet.into()))
}

#[derive(Debug, Deserialize)]
pub struct DlqListQuery {
    pub status: Option<String>,
}

/// List dead letters endpoint
///
/// GET /admin/dlq?status=PENDING|PROCESSED|FAILED
#[utoipa::path(
    get,
    path = "/admin/dlq",
    params(("status" = Option<String>, Query, description = "Optional status filter")),
    responses(
        (status = 200, description = "Dead letters, newest first", body = [DeadLetterProjection]),
        (status = 400, description = "Invalid status filter", body = ErrorBody)
    ),
    tag = "Admin"
)]
pub async fn list_dead_letters(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DlqListQuery>,
) -> Result<Json<Vec<DeadLetterProjection>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            DeadLetterStatus::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid status filter: {}", s)))?,
        ),
        None => None,
    };

    let entries = state.dlq.list(status).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Get dead letter endpoint
///
/// GET /admin/dlq/{id}
#[utoipa::path(
    get,
    path = "/admin/dlq/{id}",
    params(("id" = String, Path, description = "Dead letter id (UUID)")),
    responses(
        (status = 200, description = "Dead letter projection", body = DeadLetterProjection),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    tag = "Admin"
)]
pub async fn get_dead_letter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeadLetterProjection>, ApiError> {
    let id: DeadLetterId = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid dead letter id format"))?;

    let entry = state
        .dlq
        .get(id)
        .await?
        .ok_or(LedgerError::DeadLetterNotFound(id))?;

    Ok(Json(entry.into()))
}

/// Replay dead letter endpoint
///
/// POST /admin/dlq/{id}/replay
#[utoipa::path(
    post,
    path = "/admin/dlq/{id}/replay",
    params(("id" = String, Path, description = "Dead letter id (UUID)")),
    responses(
        (status = 200, description = "Replay outcome", body = ReplayOutcome),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    tag = "Admin"
)]
pub async fn replay_dead_letter(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReplayOutcome>, ApiError> {
    let id: DeadLetterId = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid dead letter id format"))?;

    let outcome = state.replay.replay(id).await?;
    Ok(Json(outcome))
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// OpenAPI document for the ledger surface.
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        create_wallet,
        get_wallet,
        list_dead_letters,
        get_dead_letter,
        replay_dead_letter
    ),
    components(schemas(
        CreateWalletRequest,
        WalletProjection,
        DeadLetterProjection,
        ReplayOutcome,
        ErrorBody
    )),
    tags(
        (name = "Wallet", description = "Wallet management"),
        (name = "Admin", description = "Dead letter queue administration")
    )
)]
pub struct ApiDoc;

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(ApiDoc::openapi())
}

pub fn router(
    wallets: Arc<WalletDb>,
    dlq: Arc<DeadLetterStore>,
    replay: Arc<ReplayService>,
) -> Router {
    let state = Arc::new(AppState {
        wallets,
        dlq,
        replay,
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_spec))
        .route("/wallets", post(create_wallet))
        .route("/wallets/{id}", get(get_wallet))
        .route("/admin/dlq", get(list_dead_letters))
        .route("/admin/dlq/{id}", get(get_dead_letter))
        .route("/admin/dlq/{id}/replay", post(replay_dead_letter))
        .with_state(state)
}

/// Bind and serve the ledger API.
pub async fn serve(
    host: &str,
    port: u16,
    wallets: Arc<WalletDb>,
    dlq: Arc<DeadLetterStore>,
    replay: Arc<ReplayService>,
) -> anyhow::Result<()> {
    let app = router(wallets, dlq, replay);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Ledger API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
