// src/handlers/billing.rs

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        billing::{BillingOverview, CheckoutOrder, CreateOrderPayload, PaymentVerified, VerifyPaymentPayload},
        tenancy::TenantContext,
    },
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

// GET /api/billing
#[utoipa::path(
    get,
    path = "/api/billing",
    tag = "Billing",
    responses((status = 200, description = "Assinatura atual e planos disponíveis", body = BillingOverview)),
    security(("api_jwt" = []))
)]
pub async fn get_overview(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<Json<BillingOverview>, ApiError> {
    let overview = app_state
        .billing_service
        .overview(tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(overview))
}

// POST /api/billing/orders
#[utoipa::path(
    post,
    path = "/api/billing/orders",
    tag = "Billing",
    request_body = CreateOrderPayload,
    responses(
        (status = 200, description = "Dados para abrir o checkout", body = CheckoutOrder),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<Json<CheckoutOrder>, ApiError> {
    let order = app_state
        .billing_service
        .create_order(&user, &tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(order))
}

// POST /api/billing/verify
#[utoipa::path(
    post,
    path = "/api/billing/verify",
    tag = "Billing",
    request_body = VerifyPaymentPayload,
    responses(
        (status = 200, description = "Pagamento confirmado, plano atualizado", body = PaymentVerified),
        (status = 400, description = "Assinatura do pagamento inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Result<Json<PaymentVerified>, ApiError> {
    let verified = app_state
        .billing_service
        .verify_payment(&user, &tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(verified))
}

// POST /api/billing/webhook/razorpay (público, autenticado pela assinatura HMAC)
#[utoipa::path(
    post,
    path = "/api/billing/webhook/razorpay",
    tag = "Billing",
    request_body(content = String, description = "Evento do gateway (corpo bruto)", content_type = "application/json"),
    params(("X-Razorpay-Signature" = String, Header, description = "HMAC-SHA256 do corpo")),
    responses(
        (status = 200, description = "Evento recebido"),
        (status = 400, description = "Assinatura inválida")
    )
)]
pub async fn razorpay_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if app_state.billing_service.handle_webhook(&body, signature).await {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}
