//! Coordinator HTTP API.
//!
//! `POST /transfers` accepts a saga and returns immediately with PENDING;
//! completion is observed by polling `GET /transfers/{id}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use utoipa::ToSchema;

use super::db::Transfer;
use super::error::CoordinatorError;
use super::service::TransferService;
use crate::core_types::{Amount, TransferId, WalletId};

pub struct AppState {
    pub service: Arc<TransferService>,
}

/// API error body: `{code, message}`.
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

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
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
pub struct CreateTransferRequest {
    #[schema(value_type = uuid::Uuid)]
    pub sender_wallet_id: WalletId,
    #[schema(value_type = uuid::Uuid)]
    pub receiver_wallet_id: WalletId,
    pub amount: Amount,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferProjection {
    #[schema(value_type = uuid::Uuid)]
    pub transfer_id: TransferId,
    #[schema(value_type = uuid::Uuid)]
    pub sender_wallet_id: WalletId,
    #[schema(value_type = uuid::Uuid)]
    pub receiver_wallet_id: WalletId,
    pub amount: Amount,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transfer> for TransferProjection {
    fn from(t: Transfer) -> Self {
        Self {
            transfer_id: t.transfer_id,
            sender_wallet_id: t.sender_wallet_id,
            receiver_wallet_id: t.receiver_wallet_id,
            amount: t.amount,
            status: t.status.as_str().to_string(),
            failure_reason: t.failure_reason,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Create transfer endpoint
///
/// POST /transfers
#[utoipa::path(
    post,
    path = "/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 202, description = "Transfer accepted", body = TransferProjection),
        (status = 400, description = "Invalid parameters", body = ErrorBody)
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<TransferProjection>), ApiError> {
    // Strict validation: unknown fields, malformed UUIDs and non-integer
    // amounts are all client errors, not deserialization 422s.
    let req: CreateTransferRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;

    let transfer = state
        .service
        .initiate(req.sender_wallet_id, req.receiver_wallet_id, req.amount)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(transfer.into())))
}

/// Get transfer endpoint
///
/// GET /transfers/{id}
#[utoipa::path(
    get,
    path = "/transfers/{id}",
    params(("id" = String, Path, description = "Transfer id (UUID)")),
    responses(
        (status = 200, description = "Transfer projection", body = TransferProjection),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Transfer not found", body = ErrorBody)
    ),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TransferProjection>, ApiError> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid transfer id format"))?;

    let transfer = state.service.get(transfer_id).await?;
    Ok(Json(transfer.into()))
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// OpenAPI document for the coordinator surface.
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(create_transfer, get_transfer),
    components(schemas(CreateTransferRequest, TransferProjection, ErrorBody)),
    tags((name = "Transfer", description = "Money transfer sagas"))
)]
pub struct ApiDoc;

async fn openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(ApiDoc::openapi())
}

pub fn router(service: Arc<TransferService>) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/health", get(health_check))
        .route("/openapi.json", get(openapi_spec))
        .route("/transfers", post(create_transfer))
        .route("/transfers/{id}", get(get_transfer))
        .with_state(state)
}

/// Bind and serve the coordinator API.
pub async fn serve(host: &str, port: u16, service: Arc<TransferService>) -> anyhow::Result<()> {
    let app = router(service);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Coordinator API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
