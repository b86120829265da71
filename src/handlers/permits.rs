// src/handlers/permits.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::Page,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        permit::{
            ActivatePermitPayload, ClosePermitPayload, PermitDashboard, PermitFilter,
            PermitPayload, PermitView, ReviewPermitPayload,
        },
        tenancy::TenantContext,
    },
};

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/permits
#[utoipa::path(
    get,
    path = "/api/permits",
    tag = "Permits",
    params(PermitFilter),
    responses((status = 200, description = "Licenças (15 por página; terceirizado vê só as suas)", body = Page<PermitView>)),
    security(("api_jwt" = []))
)]
pub async fn list_permits(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Query(filter): Query<PermitFilter>,
) -> Result<Json<Page<PermitView>>, ApiError> {
    let page = app_state
        .permit_service
        .list(&user, tenant.organization_id(), filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

// GET /api/permits/dashboard
#[utoipa::path(
    get,
    path = "/api/permits/dashboard",
    tag = "Permits",
    responses(
        (status = 200, description = "Contagens, atrasadas, pendentes e ativas", body = PermitDashboard),
        (status = 403, description = "Indisponível para terceirizados")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
) -> Result<Json<PermitDashboard>, ApiError> {
    let dashboard = app_state
        .permit_service
        .dashboard(&user, tenant.organization_id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(dashboard))
}

// GET /api/permits/{id}
#[utoipa::path(
    get,
    path = "/api/permits/{id}",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    responses(
        (status = 200, description = "Detalhe", body = PermitView),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PermitView>, ApiError> {
    let permit = app_state
        .permit_service
        .detail(&user, tenant.organization_id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

// =============================================================================
//  CICLO DE VIDA
// =============================================================================

// POST /api/permits
#[utoipa::path(
    post,
    path = "/api/permits",
    tag = "Permits",
    request_body = PermitPayload,
    responses(
        (status = 201, description = "Rascunho criado com número do dia", body = PermitView),
        (status = 400, description = "Fim planejado antes do início")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<PermitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let permit = app_state
        .permit_service
        .create(&user, &tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(permit)))
}

// PUT /api/permits/{id}
#[utoipa::path(
    put,
    path = "/api/permits/{id}",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    request_body = PermitPayload,
    responses(
        (status = 200, description = "Rascunho atualizado", body = PermitView),
        (status = 409, description = "Só rascunhos podem ser editados")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermitPayload>,
) -> Result<Json<PermitView>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let permit = app_state
        .permit_service
        .edit(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

// POST /api/permits/{id}/submit
#[utoipa::path(
    post,
    path = "/api/permits/{id}/submit",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    responses((status = 200, description = "Enviada para aprovação", body = PermitView)),
    security(("api_jwt" = []))
)]
pub async fn submit_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PermitView>, ApiError> {
    let permit = app_state
        .permit_service
        .submit(&user, tenant.organization_id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

// POST /api/permits/{id}/review
#[utoipa::path(
    post,
    path = "/api/permits/{id}/review",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    request_body = ReviewPermitPayload,
    responses(
        (status = 200, description = "Aprovada ou rejeitada", body = PermitView),
        (status = 403, description = "Somente gerente ou gerente de segurança")
    ),
    security(("api_jwt" = []))
)]
pub async fn review_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewPermitPayload>,
) -> Result<Json<PermitView>, ApiError> {
    let permit = app_state
        .permit_service
        .review(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

// POST /api/permits/{id}/activate
#[utoipa::path(
    post,
    path = "/api/permits/{id}/activate",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    request_body(content = ActivatePermitPayload, description = "Início real (opcional, padrão: agora)"),
    responses((status = 200, description = "Trabalho iniciado", body = PermitView)),
    security(("api_jwt" = []))
)]
pub async fn activate_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    payload: Option<Json<ActivatePermitPayload>>,
) -> Result<Json<PermitView>, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let permit = app_state
        .permit_service
        .activate(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

// POST /api/permits/{id}/close
#[utoipa::path(
    post,
    path = "/api/permits/{id}/close",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    request_body = ClosePermitPayload,
    responses(
        (status = 200, description = "Encerrada", body = PermitView),
        (status = 400, description = "Local não restaurado")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClosePermitPayload>,
) -> Result<Json<PermitView>, ApiError> {
    let permit = app_state
        .permit_service
        .close(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}

// POST /api/permits/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/permits/{id}/cancel",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    responses((status = 200, description = "Cancelada", body = PermitView)),
    security(("api_jwt" = []))
)]
pub async fn cancel_permit(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<PermitView>, ApiError> {
    let permit = app_state
        .permit_service
        .cancel(&user, tenant.organization_id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permit))
}
