//! HTTP service boundary.
//!
//! A thin router over the orchestrators. Authentication, sessions, and
//! CSRF live in the gateway in front of this service; the operator
//! identity arrives in the `x-actor` header and falls back to the
//! `system` sentinel for automated callers.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::decimal::format_decimal;
use crate::domain::{Order, StatusHistoryEntry};
use crate::payments::RefundOutcome;
use crate::service::{CancellationService, StatusUpdate, StatusUpdateService};
use crate::storage::OrderStore;
use crate::OrderError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub cancellations: Arc<CancellationService>,
    pub status_updates: Arc<StatusUpdateService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({"status": "healthy", "service": "storefront-orders"}))
            }),
        )
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/status", post(update_order_status))
        .route("/api/v1/orders/:id/refund-retry", post(retry_refund))
        .route("/api/v1/orders/:id/history", get(list_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Order detail payload; money fields are re-normalized through the
/// decimal utility so a malformed stored value fails loudly instead of
/// rendering garbage.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_email: String,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub subtotal: String,
    pub shipping_total: String,
    pub tax_total: String,
    pub total: String,
    pub currency: String,
    pub payment_provider: Option<String>,
    pub payment_reference: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    fn from_order(order: Order) -> Result<Self, OrderError> {
        Ok(Self {
            subtotal: format_decimal(order.subtotal_amount()?),
            shipping_total: format_decimal(order.shipping_amount()?),
            tax_total: format_decimal(order.tax_amount()?),
            total: format_decimal(order.total_amount()?),
            id: order.id,
            order_number: order.order_number,
            customer_email: order.customer_email,
            status: order.status,
            payment_status: order.payment_status,
            fulfillment_status: order.fulfillment_status,
            currency: order.currency,
            payment_provider: order.payment_provider,
            payment_reference: order.payment_reference,
            paid_at: order.paid_at,
            cancelled_at: order.cancelled_at,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub success: bool,
    pub order: OrderResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_result: Option<RefundOutcome>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub fulfillment_status: Option<String>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub refunds_only: Option<bool>,
}

async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, (StatusCode, String)> {
    let order = s
        .store
        .get_order(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(OrderError::NotFound))?;
    Ok(Json(OrderResponse::from_order(order).map_err(error_response)?))
}

async fn cancel_order(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(r): Json<CancelOrderRequest>,
) -> Result<Json<CancelOrderResponse>, (StatusCode, String)> {
    r.validate()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let actor = actor_from(&headers);
    let result = s
        .cancellations
        .cancel_order(id, &actor, r.reason)
        .await
        .map_err(error_response)?;
    Ok(Json(CancelOrderResponse {
        success: true,
        order: OrderResponse::from_order(result.order).map_err(error_response)?,
        refund_result: result.refund,
    }))
}

async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, (StatusCode, String)> {
    r.validate()
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let actor = actor_from(&headers);
    let update = StatusUpdate {
        status: r.status,
        payment_status: r.payment_status,
        fulfillment_status: r.fulfillment_status,
    };
    let order = s
        .status_updates
        .update_order_status(id, update, &actor, r.reason)
        .await
        .map_err(error_response)?;
    Ok(Json(OrderResponse::from_order(order).map_err(error_response)?))
}

async fn retry_refund(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<RefundOutcome>, (StatusCode, String)> {
    let actor = actor_from(&headers);
    let outcome = s
        .cancellations
        .retry_refund(id, &actor)
        .await
        .map_err(error_response)?;
    Ok(Json(outcome))
}

async fn list_history(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Query(p): Query<HistoryParams>,
) -> Result<Json<Vec<StatusHistoryEntry>>, (StatusCode, String)> {
    s.store
        .get_order(id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(OrderError::NotFound))?;
    let entries = if p.refunds_only.unwrap_or(false) {
        s.store.list_refund_history(id).await
    } else {
        s.store.list_status_history(id).await
    }
    .map_err(error_response)?;
    Ok(Json(entries))
}

fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("system")
        .to_string()
}

fn error_response(e: OrderError) -> (StatusCode, String) {
    match &e {
        OrderError::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
        OrderError::AlreadyCancelled
        | OrderError::NotCancelled
        | OrderError::InvalidStatus { .. } => (StatusCode::CONFLICT, e.to_string()),
        OrderError::MalformedDecimal(_) | OrderError::Config(_) | OrderError::Storage(_) => {
            tracing::error!("request failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
        }
    }
}
