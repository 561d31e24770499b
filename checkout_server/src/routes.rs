//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate module.
//!
//! Handlers are generic over the storage backend so they can be exercised against any [`StorefrontDatabase`]
//! implementation; the server instantiates them with [`checkout_engine::SqliteDatabase`].
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use checkout_engine::{
    db_types::{NewOrderRequest, OrderNumber},
    OrderFlowApi,
    StorefrontDatabase,
};
use chrono::Utc;
use log::*;
use serde_json::Value;

use crate::{
    config::ServerConfig,
    data_objects::{ManualConfirmRequest, PaymentInfoResponse, SweepResponse, WebhookAck},
    errors::ServerError,
    helpers::{payment_info_for, verify_webhook_signature},
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ---------------------------------------------------
/// Route handler for order creation.
///
/// Validation failures (empty order, unknown product or variant, insufficient stock) abort before anything is
/// persisted and map to a 4xx response; see [`ServerError`].
pub async fn place_order<B: StorefrontDatabase>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST order for customer {} with {} item line(s)", request.customer_id, request.items.len());
    let order = api.place_order(request).await?;
    Ok(HttpResponse::Created().json(order))
}

//--------------------------------------------   Payment info  -------------------------------------------------
/// Route handler for the bank-transfer payment instructions of an order: account display data, the QR image link
/// and the number of seconds left before the expiry sweep may cancel the order.
pub async fn payment_info<B: StorefrontDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.into_inner());
    let order = api
        .db()
        .fetch_order_by_number(&number)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {number}")))?;
    let info: PaymentInfoResponse =
        payment_info_for(&order, &config.bank, api.policy().payment_timeout, Utc::now());
    Ok(HttpResponse::Ok().json(info))
}

//------------------------------------------   Manual confirmation  --------------------------------------------
/// Route handler for the operator's manual payment confirmation.
///
/// Authorisation is enforced at the boundary in front of this server; the authorising proxy injects the operator
/// name in the `x-operator` header. Typed rejections: 404 for an unknown order, 409 when the order is already paid
/// or already cancelled.
pub async fn confirm_payment<B: StorefrontDatabase>(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ManualConfirmRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber::from(path.into_inner());
    let operator =
        req.headers().get("x-operator").and_then(|v| v.to_str().ok()).unwrap_or("operator").to_string();
    let request = body.into_inner();
    debug!("💻️ POST manual confirmation for order {number} by {operator}");
    let order = api.confirm_payment_manually(&number, request.transaction_id, request.note, &operator).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Sweep  ------------------------------------------------------
/// Route handler for the operator-triggered expiry sweep. The same sweep runs on a timer; this endpoint exists so
/// the back office can force one without waiting for the next tick.
pub async fn trigger_sweep<B: StorefrontDatabase>(
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let result = api.expire_overdue_orders().await?;
    info!("💻️ Manual sweep cancelled {} order(s)", result.cancelled_count());
    let response = SweepResponse {
        cancelled_count: result.cancelled_count(),
        cancelled_orders: result.order_numbers().iter().map(|n| n.to_string()).collect(),
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
/// Route handler for incoming payment notifications.
///
/// Transport and signature problems are the only ways to get a non-200 out of this endpoint (providers retry on
/// 5xx, and redelivering a business rejection would just fail again). Every reconciliation outcome, including the
/// typed failures, is acknowledged with a 200 and a [`WebhookAck`] body.
pub async fn payment_webhook<B: StorefrontDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    trace!("🏦️ Received payment webhook: {}", req.uri());
    if let Some(secret) = &config.webhook_secret {
        let signature = req.headers().get("x-signature").and_then(|v| v.to_str().ok());
        let authorization = req.headers().get("authorization").and_then(|v| v.to_str().ok());
        if !verify_webhook_signature(secret.reveal(), &body, signature, authorization) {
            warn!("🏦️ Webhook rejected: invalid or missing signature");
            return Err(ServerError::InvalidSignature);
        }
    }
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ServerError::InvalidRequestBody(format!("webhook body is not JSON: {e}")))?;
    let ack = match api.handle_payment_notification(&payload).await {
        Ok(outcome) => {
            if outcome.already_applied {
                info!("🏦️ Replayed notification for order {} acknowledged", outcome.order.order_number);
            } else {
                info!("🏦️ Payment applied to order {}", outcome.order.order_number);
            }
            WebhookAck::confirmed(&outcome)
        },
        Err(e) => {
            warn!("🏦️ Payment notification not applied: {e}");
            WebhookAck::rejected(e)
        },
    };
    Ok(HttpResponse::Ok().json(ack))
}
