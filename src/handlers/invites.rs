// src/handlers/invites.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        auth::{AuthResponse, User},
        invite::{
            AcceptInvitePayload, ContractorIssued, InviteContractorPayload, InviteIssued,
            InviteUserPayload, UserInvite,
        },
        tenancy::TenantContext,
    },
};

// POST /api/invites
#[utoipa::path(
    post,
    path = "/api/invites",
    tag = "Invites",
    request_body = InviteUserPayload,
    responses(
        (status = 201, description = "Convite criado (avisos se o e-mail falhar)", body = InviteIssued),
        (status = 402, description = "Limite de usuários do plano atingido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invite(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<InviteUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let issued = app_state
        .invite_service
        .issue(&user, &tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(issued)))
}

// GET /api/invites
#[utoipa::path(
    get,
    path = "/api/invites",
    tag = "Invites",
    responses((status = 200, description = "Convites pendentes", body = Vec<UserInvite>)),
    security(("api_jwt" = []))
)]
pub async fn list_invites(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
) -> Result<Json<Vec<UserInvite>>, ApiError> {
    let invites = app_state
        .invite_service
        .list_pending(&user, tenant.organization_id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(invites))
}

// POST /api/invites/{token}/accept (público)
#[utoipa::path(
    post,
    path = "/api/invites/{token}/accept",
    tag = "Invites",
    params(("token" = Uuid, Path, description = "Token do convite")),
    request_body = AcceptInvitePayload,
    responses(
        (status = 200, description = "Convite aceito, sessão iniciada", body = AuthResponse),
        (status = 410, description = "Convite inválido, expirado ou já usado")
    )
)]
pub async fn accept_invite(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(token): Path<Uuid>,
    Json(payload): Json<AcceptInvitePayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let token = app_state
        .invite_service
        .accept(token, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(AuthResponse { token }))
}

// POST /api/contractors
#[utoipa::path(
    post,
    path = "/api/contractors",
    tag = "Invites",
    request_body = InviteContractorPayload,
    responses(
        (status = 201, description = "Terceirizado criado com senha temporária", body = ContractorIssued),
        (status = 409, description = "E-mail já em uso")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_contractor(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<InviteContractorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let issued = app_state
        .invite_service
        .invite_contractor(&user, &tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(issued)))
}

// GET /api/contractors
#[utoipa::path(
    get,
    path = "/api/contractors",
    tag = "Invites",
    responses((status = 200, description = "Terceirizados da organização", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_contractors(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
) -> Result<Json<Vec<User>>, ApiError> {
    let contractors = app_state
        .invite_service
        .list_contractors(&user, tenant.organization_id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(contractors))
}
