// src/handlers/tenancy.rs

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
    models::tenancy::{CreateLocationPayload, Location, TenantContext, TenantOverview},
};

// GET /api/tenant
#[utoipa::path(
    get,
    path = "/api/tenant",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Organização, assinatura e uso do plano", body = TenantOverview),
        (status = 403, description = "Usuário sem organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<Json<TenantOverview>, ApiError> {
    let overview = app_state
        .tenant_service
        .overview(tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(overview))
}

// POST /api/locations
#[utoipa::path(
    post,
    path = "/api/locations",
    tag = "Tenancy",
    request_body = CreateLocationPayload,
    responses((status = 201, description = "Local criado", body = Location)),
    security(("api_jwt" = []))
)]
pub async fn create_location(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateLocationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let location = app_state
        .tenant_service
        .create_location(&user, tenant.organization_id(), payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(location)))
}

// GET /api/locations
#[utoipa::path(
    get,
    path = "/api/locations",
    tag = "Tenancy",
    responses((status = 200, description = "Locais da organização", body = Vec<Location>)),
    security(("api_jwt" = []))
)]
pub async fn list_locations(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<Json<Vec<Location>>, ApiError> {
    let locations = app_state
        .tenant_service
        .list_locations(tenant.organization_id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(locations))
}

// DELETE /api/locations/{id}
#[utoipa::path(
    delete,
    path = "/api/locations/{id}",
    tag = "Tenancy",
    params(("id" = Uuid, Path, description = "ID do local")),
    responses(
        (status = 204, description = "Local removido"),
        (status = 409, description = "Local ainda referenciado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_location(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state
        .tenant_service
        .delete_location(&user, tenant.organization_id(), id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
