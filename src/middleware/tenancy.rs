// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{header, request::Parts, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{auth::User, tenancy::TenantContext},
    workflow::access::{self, GateDecision, LOGIN_PATH},
};

/// Aviso exibido pelo cliente depois de um redirecionamento.
pub static FLASH_WARNING: HeaderName = HeaderName::from_static("x-flash-warning");
/// Para onde o cliente deve ir depois de descartar a sessão.
pub static REDIRECT_TO: HeaderName = HeaderName::from_static("x-redirect-to");

// Converte a decisão das regras de acesso em resposta (None = segue o fluxo)
pub fn gate_response(decision: GateDecision) -> Option<Response> {
    match decision {
        GateDecision::Allow => None,
        GateDecision::Redirect { to, warning } => {
            let mut response = StatusCode::SEE_OTHER.into_response();
            let headers = response.headers_mut();
            headers.insert(header::LOCATION, HeaderValue::from_static(to));
            if let Some(value) = warning.and_then(|w| HeaderValue::from_str(&w).ok()) {
                headers.insert(FLASH_WARNING.clone(), value);
            }
            Some(response)
        }
        GateDecision::ForceLogout(err) => {
            tracing::info!("Sessão encerrada pelas regras de acesso: {}", err);
            let mut response = err.into_response();
            response
                .headers_mut()
                .insert(REDIRECT_TO.clone(), HeaderValue::from_static(LOGIN_PATH));
            Some(response)
        }
    }
}

// Roda depois do auth_guard: resolve o tenant do usuário e aplica as
// regras de assinatura vencida e de terceirizados antes de qualquer handler.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;

    let tenant = app_state.tenant_service.resolve_tenant(&user).await?;

    // Dentro de um router aninhado o path chega sem o prefixo
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let decision = access::evaluate(
        &user,
        tenant.as_ref().and_then(|t| t.subscription.as_ref()),
        request.method(),
        &path,
        Utc::now(),
    );
    if let Some(response) = gate_response(decision) {
        return Ok(response);
    }

    if let Some(tenant) = tenant {
        request.extensions_mut().insert(tenant);
    }
    Ok(next.run(request).await)
}

// Handlers que exigem organização recebem o contexto já resolvido
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::NoOrganization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn redirect_carries_location_and_warning() {
        let response = gate_response(GateDecision::Redirect {
            to: access::BILLING_PATH,
            warning: Some("Your subscription has expired.".into()),
        })
        .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], access::BILLING_PATH);
        assert_eq!(response.headers()[&FLASH_WARNING], "Your subscription has expired.");
    }

    #[test]
    fn forced_logout_points_to_login() {
        let expiry = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let response = gate_response(GateDecision::ForceLogout(AppError::ContractorAccessExpired(expiry))).unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[&REDIRECT_TO], LOGIN_PATH);
    }

    #[test]
    fn allow_passes_through() {
        assert!(gate_response(GateDecision::Allow).is_none());
    }
}
