// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::signup,
        handlers::auth::login,
        handlers::auth::logout,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::list_members,

        // --- Tenancy ---
        handlers::tenancy::get_tenant,
        handlers::tenancy::create_location,
        handlers::tenancy::list_locations,
        handlers::tenancy::delete_location,

        // --- Invites ---
        handlers::invites::create_invite,
        handlers::invites::list_invites,
        handlers::invites::accept_invite,
        handlers::invites::create_contractor,
        handlers::invites::list_contractors,

        // --- Observations ---
        handlers::observations::list_observations,
        handlers::observations::list_archived,
        handlers::observations::get_dashboard,
        handlers::observations::get_observation,
        handlers::observations::create_observation,
        handlers::observations::assign_observation,
        handlers::observations::rectify_observation,
        handlers::observations::verify_observation,
        handlers::observations::archive_observation,
        handlers::observations::restore_observation,
        handlers::observations::delete_observation,

        // --- Permits ---
        handlers::permits::list_permits,
        handlers::permits::get_dashboard,
        handlers::permits::get_permit,
        handlers::permits::create_permit,
        handlers::permits::update_permit,
        handlers::permits::submit_permit,
        handlers::permits::review_permit,
        handlers::permits::activate_permit,
        handlers::permits::close_permit,
        handlers::permits::cancel_permit,
        handlers::documents::permit_pdf,

        // --- Billing ---
        handlers::billing::get_overview,
        handlers::billing::create_order,
        handlers::billing::verify_payment,
        handlers::billing::razorpay_webhook,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::SignupPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Organization,
            models::tenancy::PlanTier,
            models::tenancy::Plan,
            models::tenancy::SubscriptionStatus,
            models::tenancy::Subscription,
            models::tenancy::Location,
            models::tenancy::CreateLocationPayload,
            models::tenancy::TenantOverview,

            // --- Invites ---
            models::invite::InviteRole,
            models::invite::UserInvite,
            models::invite::InviteUserPayload,
            models::invite::AcceptInvitePayload,
            models::invite::InviteContractorPayload,
            models::invite::InviteIssued,
            models::invite::ContractorIssued,

            // --- Observations ---
            models::observation::Severity,
            models::observation::ObservationStatus,
            models::observation::Observation,
            models::observation::CreateObservationPayload,
            models::observation::AssignObservationPayload,
            models::observation::RectifyObservationPayload,
            models::observation::VerificationAction,
            models::observation::VerifyObservationPayload,
            models::observation::ObservationCreated,
            models::observation::ObservationDashboard,

            // --- Permits ---
            models::permit::WorkType,
            models::permit::PermitStatus,
            models::permit::Permit,
            models::permit::PermitPayload,
            models::permit::ReviewDecision,
            models::permit::ReviewPermitPayload,
            models::permit::ActivatePermitPayload,
            models::permit::ClosePermitPayload,
            models::permit::PermitView,
            models::permit::StatusCount,
            models::permit::WorkTypeCount,
            models::permit::PermitDashboard,

            // --- Billing ---
            models::billing::PaymentType,
            models::billing::OrderStatus,
            models::billing::RazorpayOrder,
            models::billing::CreateOrderPayload,
            models::billing::CheckoutOrder,
            models::billing::VerifyPaymentPayload,
            models::billing::PaymentVerified,
            models::billing::BillingOverview,
        )
    ),
    tags(
        (name = "Auth", description = "Cadastro, login e logout"),
        (name = "Users", description = "Perfil e membros da organização"),
        (name = "Tenancy", description = "Organização, assinatura e locais"),
        (name = "Invites", description = "Convites e terceirizados"),
        (name = "Observations", description = "Observações de segurança"),
        (name = "Permits", description = "Licenças de trabalho (PTW)"),
        (name = "Billing", description = "Planos, pagamentos e webhook do gateway")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}
