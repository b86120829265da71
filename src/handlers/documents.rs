// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::tenancy::TenantContext,
};

// GET /api/permits/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/permits/{id}/pdf",
    tag = "Permits",
    params(("id" = Uuid, Path, description = "ID da licença")),
    responses(
        (status = 200, description = "PDF da licença com QR Code", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn permit_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (permit_number, pdf_bytes) = app_state
        .permit_service
        .pdf(&user, &tenant, id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.pdf\"", permit_number),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
