// src/workflow/access.rs

use axum::http::Method;
use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{auth::User, tenancy::Subscription},
};

pub const BILLING_PATH: &str = "/api/billing";
pub const PERMITS_PATH: &str = "/api/permits";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const PROFILE_PATH: &str = "/api/users/me";

// Prefixos liberados para terceirizados
const CONTRACTOR_ALLOWED: &[&str] = &[PERMITS_PATH, LOGIN_PATH, LOGOUT_PATH, "/static", "/media"];

// Rotas que continuam acessíveis com a assinatura vencida
const EXPIRED_SUBSCRIPTION_ALLOWED: &[&str] = &[BILLING_PATH, LOGOUT_PATH];

/// Resultado das regras de interceptação, avaliadas antes de qualquer handler.
#[derive(Debug)]
pub enum GateDecision {
    Allow,
    Redirect {
        to: &'static str,
        warning: Option<String>,
    },
    /// A sessão deve ser descartada pelo cliente.
    ForceLogout(AppError),
}

/// `/api/permits` casa com `/api/permits` e `/api/permits/...`, mas não com `/api/permitsx`.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

fn matches_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| path_has_prefix(path, prefix))
}

/// Regra 1: assinatura com expiração no passado manda tudo para o faturamento.
pub fn subscription_gate(
    subscription: Option<&Subscription>,
    path: &str,
    now: DateTime<Utc>,
) -> GateDecision {
    match subscription {
        Some(sub) if sub.is_expired(now) && !matches_any(path, EXPIRED_SUBSCRIPTION_ALLOWED) => {
            GateDecision::Redirect {
                to: BILLING_PATH,
                warning: Some("Your subscription has expired. Please renew to continue.".into()),
            }
        }
        _ => GateDecision::Allow,
    }
}

/// Regra 2: terceirizados ficam restritos ao módulo de licenças.
pub fn contractor_gate(user: &User, method: &Method, path: &str, now: DateTime<Utc>) -> GateDecision {
    if !user.is_contractor() {
        return GateDecision::Allow;
    }

    if let Some(expiry) = user.contractor_access_expiry {
        if user.is_contractor_expired(now.date_naive()) {
            return GateDecision::ForceLogout(AppError::ContractorAccessExpired(expiry));
        }
    }

    // Perfil somente leitura
    if path_has_prefix(path, PROFILE_PATH) && *method == Method::GET {
        return GateDecision::Allow;
    }

    if matches_any(path, CONTRACTOR_ALLOWED) {
        return GateDecision::Allow;
    }

    GateDecision::Redirect {
        to: PERMITS_PATH,
        warning: Some(format!(
            "Contractor users do not have access to {}. You can only create and manage your own permit requests.",
            area_name(path)
        )),
    }
}

fn area_name(path: &str) -> &'static str {
    const AREAS: &[(&str, &str)] = &[
        ("/api/observations", "Safety Observations"),
        ("/api/invites", "Organization Management"),
        ("/api/contractors", "Organization Management"),
        ("/api/locations", "Organization Management"),
        ("/api/tenant", "Organization Management"),
        (BILLING_PATH, "Billing & Plans"),
    ];
    AREAS
        .iter()
        .find(|(prefix, _)| path_has_prefix(path, prefix))
        .map(|(_, name)| *name)
        .unwrap_or("this area")
}

/// Avalia as duas regras na ordem: terceirizado primeiro, depois assinatura.
/// Terceirizado não acessa o faturamento, então assinatura vencida o desconecta.
pub fn evaluate(
    user: &User,
    subscription: Option<&Subscription>,
    method: &Method,
    path: &str,
    now: DateTime<Utc>,
) -> GateDecision {
    let decision = contractor_gate(user, method, path, now);
    if !matches!(decision, GateDecision::Allow) {
        return decision;
    }

    match subscription_gate(subscription, path, now) {
        GateDecision::Redirect { .. } if user.is_contractor() => GateDecision::ForceLogout(
            AppError::Authorization(
                "The organization's subscription has expired. Please contact the site administrator.".into(),
            ),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        auth::{fixtures::user, Role},
        tenancy::{fixtures::plan, PlanTier},
    };
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn expired_subscription(now: DateTime<Utc>) -> Subscription {
        let pro = plan(PlanTier::Pro, None, None);
        let mut sub = Subscription::for_new_organization(Uuid::new_v4(), &pro, now);
        sub.activate_onetime(&pro, now - Duration::days(400));
        sub
    }

    #[test]
    fn prefix_matching_respects_segments() {
        assert!(path_has_prefix("/api/permits", PERMITS_PATH));
        assert!(path_has_prefix("/api/permits/abc/submit", PERMITS_PATH));
        assert!(!path_has_prefix("/api/permitsx", PERMITS_PATH));
        assert!(!path_has_prefix("/api/observations", PERMITS_PATH));
    }

    #[test]
    fn expired_subscription_redirects_everything_but_billing_and_logout() {
        let now = Utc::now();
        let sub = expired_subscription(now);

        assert!(matches!(
            subscription_gate(Some(&sub), "/api/observations", now),
            GateDecision::Redirect { to: BILLING_PATH, .. }
        ));
        assert!(matches!(subscription_gate(Some(&sub), "/api/billing/orders", now), GateDecision::Allow));
        assert!(matches!(subscription_gate(Some(&sub), LOGOUT_PATH, now), GateDecision::Allow));
        assert!(matches!(subscription_gate(None, "/api/observations", now), GateDecision::Allow));
    }

    #[test]
    fn subscription_without_expiry_never_redirects() {
        let now = Utc::now();
        let free = plan(PlanTier::Trial, Some(5), Some(50));
        let sub = Subscription::for_new_organization(Uuid::new_v4(), &free, now);
        assert!(matches!(subscription_gate(Some(&sub), "/api/observations", now), GateDecision::Allow));
    }

    #[test]
    fn contractor_is_redirected_away_from_observations() {
        let now = Utc::now();
        let contractor = user(&[Role::Contractor], Some(Uuid::new_v4()));

        match contractor_gate(&contractor, &Method::GET, "/api/observations", now) {
            GateDecision::Redirect { to, warning } => {
                assert_eq!(to, PERMITS_PATH);
                assert!(warning.unwrap().contains("Safety Observations"));
            }
            other => panic!("expected redirect, got {:?}", other),
        }
        assert!(matches!(
            contractor_gate(&contractor, &Method::POST, "/api/permits", now),
            GateDecision::Allow
        ));
    }

    #[test]
    fn contractor_profile_is_read_only() {
        let now = Utc::now();
        let contractor = user(&[Role::Contractor], Some(Uuid::new_v4()));
        assert!(matches!(contractor_gate(&contractor, &Method::GET, PROFILE_PATH, now), GateDecision::Allow));
        assert!(matches!(
            contractor_gate(&contractor, &Method::PUT, PROFILE_PATH, now),
            GateDecision::Redirect { .. }
        ));
    }

    #[test]
    fn expired_contractor_is_logged_out_even_on_permits() {
        let now = Utc::now();
        let mut contractor = user(&[Role::Contractor], Some(Uuid::new_v4()));
        contractor.contractor_access_expiry = NaiveDate::from_ymd_opt(2020, 1, 1);

        assert!(matches!(
            contractor_gate(&contractor, &Method::GET, "/api/permits", now),
            GateDecision::ForceLogout(AppError::ContractorAccessExpired(_))
        ));
    }

    #[test]
    fn contractor_on_expired_subscription_is_logged_out_instead_of_looping() {
        let now = Utc::now();
        let sub = expired_subscription(now);
        let contractor = user(&[Role::Contractor], Some(sub.organization_id));
        let manager = user(&[Role::Manager], Some(sub.organization_id));

        assert!(matches!(
            evaluate(&contractor, Some(&sub), &Method::GET, "/api/permits", now),
            GateDecision::ForceLogout(AppError::Authorization(_))
        ));
        assert!(matches!(
            evaluate(&manager, Some(&sub), &Method::GET, "/api/permits", now),
            GateDecision::Redirect { to: BILLING_PATH, .. }
        ));
    }
}
