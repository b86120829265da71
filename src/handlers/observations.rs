// src/handlers/observations.rs

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
        db_utils::{Page, SearchParams},
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        observation::{
            AssignObservationPayload, CreateObservationPayload, Observation, ObservationCreated,
            ObservationDashboard, RectifyObservationPayload, VerifyObservationPayload,
        },
        tenancy::TenantContext,
    },
};

// =============================================================================
//  LISTAGENS
// =============================================================================

// GET /api/observations
#[utoipa::path(
    get,
    path = "/api/observations",
    tag = "Observations",
    params(SearchParams),
    responses((status = 200, description = "Observações ativas (10 por página)", body = Page<Observation>)),
    security(("api_jwt" = []))
)]
pub async fn list_observations(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Observation>>, ApiError> {
    let page = app_state
        .observation_service
        .list(&user, tenant.organization_id(), false, params)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

// GET /api/observations/archived
#[utoipa::path(
    get,
    path = "/api/observations/archived",
    tag = "Observations",
    params(SearchParams),
    responses((status = 200, description = "Observações arquivadas", body = Page<Observation>)),
    security(("api_jwt" = []))
)]
pub async fn list_archived(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Observation>>, ApiError> {
    let page = app_state
        .observation_service
        .list(&user, tenant.organization_id(), true, params)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(page))
}

// GET /api/observations/dashboard
#[utoipa::path(
    get,
    path = "/api/observations/dashboard",
    tag = "Observations",
    responses((status = 200, description = "Contadores do painel", body = ObservationDashboard)),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
) -> Result<Json<ObservationDashboard>, ApiError> {
    let dashboard = app_state
        .observation_service
        .dashboard(&user, tenant.organization_id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(dashboard))
}

// GET /api/observations/{id}
#[utoipa::path(
    get,
    path = "/api/observations/{id}",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    responses(
        (status = 200, description = "Detalhe", body = Observation),
        (status = 404, description = "Não encontrada (ou de outra organização)")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Observation>, ApiError> {
    let observation = app_state
        .observation_service
        .detail(&user, tenant.organization_id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(observation))
}

// =============================================================================
//  CICLO DE VIDA
// =============================================================================

// POST /api/observations
#[utoipa::path(
    post,
    path = "/api/observations",
    tag = "Observations",
    request_body = CreateObservationPayload,
    responses(
        (status = 201, description = "Observação registrada", body = ObservationCreated),
        (status = 402, description = "Limite de observações do plano atingido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateObservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let created = app_state
        .observation_service
        .create(&user, &tenant, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// POST /api/observations/{id}/assign
#[utoipa::path(
    post,
    path = "/api/observations/{id}/assign",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    request_body = AssignObservationPayload,
    responses((status = 200, description = "Responsável definido", body = Observation)),
    security(("api_jwt" = []))
)]
pub async fn assign_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignObservationPayload>,
) -> Result<Json<Observation>, ApiError> {
    let observation = app_state
        .observation_service
        .assign(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(observation))
}

// POST /api/observations/{id}/rectify
#[utoipa::path(
    post,
    path = "/api/observations/{id}/rectify",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    request_body = RectifyObservationPayload,
    responses(
        (status = 200, description = "Correção enviada para verificação", body = Observation),
        (status = 403, description = "Somente o responsável pode corrigir"),
        (status = 409, description = "Status não permite correção")
    ),
    security(("api_jwt" = []))
)]
pub async fn rectify_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RectifyObservationPayload>,
) -> Result<Json<Observation>, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let observation = app_state
        .observation_service
        .rectify(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(observation))
}

// POST /api/observations/{id}/verify
#[utoipa::path(
    post,
    path = "/api/observations/{id}/verify",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    request_body = VerifyObservationPayload,
    responses(
        (status = 200, description = "Aprovada (CLOSED) ou devolvida (IN_PROGRESS)", body = Observation),
        (status = 409, description = "Observação não aguarda verificação")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyObservationPayload>,
) -> Result<Json<Observation>, ApiError> {
    let observation = app_state
        .observation_service
        .verify(&user, tenant.organization_id(), id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(observation))
}

// POST /api/observations/{id}/archive
#[utoipa::path(
    post,
    path = "/api/observations/{id}/archive",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    responses((status = 200, description = "Arquivada", body = Observation)),
    security(("api_jwt" = []))
)]
pub async fn archive_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Observation>, ApiError> {
    let observation = app_state
        .observation_service
        .set_archived(&user, tenant.organization_id(), id, true)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(observation))
}

// POST /api/observations/{id}/restore
#[utoipa::path(
    post,
    path = "/api/observations/{id}/restore",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    responses((status = 200, description = "Restaurada", body = Observation)),
    security(("api_jwt" = []))
)]
pub async fn restore_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Observation>, ApiError> {
    let observation = app_state
        .observation_service
        .set_archived(&user, tenant.organization_id(), id, false)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(observation))
}

// DELETE /api/observations/{id}
#[utoipa::path(
    delete,
    path = "/api/observations/{id}",
    tag = "Observations",
    params(("id" = Uuid, Path, description = "ID da observação")),
    responses(
        (status = 204, description = "Excluída"),
        (status = 403, description = "Somente gerente ou superusuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_observation(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .observation_service
        .delete(&user, tenant.organization_id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
