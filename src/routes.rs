// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::{auth::auth_guard, tenancy::tenant_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Rotas públicas
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/invites/{token}/accept", post(handlers::invites::accept_invite))
        .route("/api/billing/webhook/razorpay", post(handlers::billing::razorpay_webhook));

    // Rotas protegidas: auth_guard roda primeiro (último layer adicionado),
    // depois tenant_guard com as regras de assinatura e de terceirizados
    let protected_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/users/me", get(handlers::auth::get_me))
        .route("/api/users", get(handlers::auth::list_members))
        // --- Tenancy ---
        .route("/api/tenant", get(handlers::tenancy::get_tenant))
        .route(
            "/api/locations",
            post(handlers::tenancy::create_location).get(handlers::tenancy::list_locations),
        )
        .route("/api/locations/{id}", delete(handlers::tenancy::delete_location))
        // --- Invites ---
        .route(
            "/api/invites",
            post(handlers::invites::create_invite).get(handlers::invites::list_invites),
        )
        .route(
            "/api/contractors",
            post(handlers::invites::create_contractor).get(handlers::invites::list_contractors),
        )
        // --- Observations ---
        .route(
            "/api/observations",
            post(handlers::observations::create_observation).get(handlers::observations::list_observations),
        )
        .route("/api/observations/archived", get(handlers::observations::list_archived))
        .route("/api/observations/dashboard", get(handlers::observations::get_dashboard))
        .route(
            "/api/observations/{id}",
            get(handlers::observations::get_observation).delete(handlers::observations::delete_observation),
        )
        .route("/api/observations/{id}/assign", post(handlers::observations::assign_observation))
        .route("/api/observations/{id}/rectify", post(handlers::observations::rectify_observation))
        .route("/api/observations/{id}/verify", post(handlers::observations::verify_observation))
        .route("/api/observations/{id}/archive", post(handlers::observations::archive_observation))
        .route("/api/observations/{id}/restore", post(handlers::observations::restore_observation))
        // --- Permits ---
        .route(
            "/api/permits",
            post(handlers::permits::create_permit).get(handlers::permits::list_permits),
        )
        .route("/api/permits/dashboard", get(handlers::permits::get_dashboard))
        .route(
            "/api/permits/{id}",
            get(handlers::permits::get_permit).put(handlers::permits::update_permit),
        )
        .route("/api/permits/{id}/submit", post(handlers::permits::submit_permit))
        .route("/api/permits/{id}/review", post(handlers::permits::review_permit))
        .route("/api/permits/{id}/activate", post(handlers::permits::activate_permit))
        .route("/api/permits/{id}/close", post(handlers::permits::close_permit))
        .route("/api/permits/{id}/cancel", post(handlers::permits::cancel_permit))
        .route("/api/permits/{id}/pdf", get(handlers::documents::permit_pdf))
        // --- Billing ---
        .route("/api/billing", get(handlers::billing::get_overview))
        .route("/api/billing/orders", post(handlers::billing::create_order))
        .route("/api/billing/verify", post(handlers::billing::verify_payment))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), tenant_guard))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
