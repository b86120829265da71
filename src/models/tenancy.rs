// src/models/tenancy.rs

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Organization (o Tenant)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    #[schema(example = "Acme Refinery")]
    pub name: String,
    #[schema(example = "acme")]
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

// ---
// 2. Plan (dados de referência, nunca apagados enquanto referenciados)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Trial,
    Basic,
    Pro,
    Enterprise,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    #[schema(example = "Pro")]
    pub name: String,
    pub tier: PlanTier,
    /// None = ilimitado
    pub max_users: Option<i32>,
    /// None = ilimitado
    pub max_observations: Option<i32>,
    #[schema(example = "1499.00")]
    pub price_monthly: Decimal,
    #[schema(example = "14990.00")]
    pub price_onetime: Decimal,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub razorpay_plan_id: String,
    pub active: bool,
}

impl Plan {
    pub fn is_free(&self) -> bool {
        self.price_monthly.is_zero() && self.price_onetime.is_zero()
    }

    /// O gateway trabalha em paise (1 INR = 100 paise).
    pub fn monthly_paise(&self) -> i64 {
        to_paise(self.price_monthly)
    }

    pub fn onetime_paise(&self) -> i64 {
        to_paise(self.price_onetime)
    }

    pub fn supports_recurring(&self) -> bool {
        !self.razorpay_plan_id.trim().is_empty()
    }

    /// `limit` finito já atingido por `current`?
    pub fn user_quota_reached(&self, current: i64) -> bool {
        quota_reached(self.max_users, current)
    }

    pub fn observation_quota_reached(&self, current: i64) -> bool {
        quota_reached(self.max_observations, current)
    }
}

fn to_paise(amount: Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (amount * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(0)
}

fn quota_reached(limit: Option<i32>, current: i64) -> bool {
    limit.is_some_and(|max| current >= i64::from(max))
}

// ---
// 3. Subscription (exatamente uma por organização)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    /// None = sem expiração
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub razorpay_customer_id: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub razorpay_subscription_id: String,
}

/// Acesso de um pagamento único.
pub const ONETIME_ACCESS_DAYS: i64 = 365;
/// Cada cobrança recorrente estende o acesso por este período.
pub const RENEWAL_PERIOD_DAYS: i64 = 32;

impl Subscription {
    /// Assinatura criada junto com a organização, no plano de menor nível.
    pub fn for_new_organization(organization_id: Uuid, plan: &Plan, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            plan_id: plan.id,
            status: SubscriptionStatus::Trial,
            is_active: true,
            created_at: now,
            updated_at: now,
            started_at: now,
            expires_at: None,
            razorpay_customer_id: String::new(),
            razorpay_subscription_id: String::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| now > expiry)
    }

    // --- Transições de cobrança ---

    pub fn activate_onetime(&mut self, plan: &Plan, now: DateTime<Utc>) {
        self.plan_id = plan.id;
        self.status = SubscriptionStatus::Active;
        self.is_active = true;
        self.started_at = now;
        self.expires_at = Some(now + Duration::days(ONETIME_ACCESS_DAYS));
        self.updated_at = now;
    }

    /// O gateway controla a renovação; a expiração fica em aberto.
    pub fn activate_recurring(&mut self, plan: &Plan, external_subscription_id: &str, now: DateTime<Utc>) {
        self.plan_id = plan.id;
        self.status = SubscriptionStatus::Active;
        self.is_active = true;
        self.started_at = now;
        self.expires_at = None;
        self.razorpay_subscription_id = external_subscription_id.to_string();
        self.updated_at = now;
    }

    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Active;
        self.is_active = true;
        self.expires_at = Some(now + Duration::days(RENEWAL_PERIOD_DAYS));
        self.updated_at = now;
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Cancelled;
        self.is_active = false;
        self.updated_at = now;
    }

    /// Pagamento recorrente parou: volta ao plano de entrada (se houver).
    pub fn halt(&mut self, fallback_plan: Option<&Plan>, now: DateTime<Utc>) {
        if let Some(plan) = fallback_plan {
            self.plan_id = plan.id;
        }
        self.status = SubscriptionStatus::Expired;
        self.is_active = false;
        self.updated_at = now;
    }

    /// Rotina agendada: ativa + expirada => plano gratuito. Devolve `true` se mudou.
    pub fn downgrade_if_expired(&mut self, free_plan: &Plan, now: DateTime<Utc>) -> bool {
        if !self.is_active || !self.is_expired(now) {
            return false;
        }
        self.plan_id = free_plan.id;
        self.status = SubscriptionStatus::Expired;
        self.is_active = false;
        self.updated_at = now;
        true
    }
}

// ---
// 4. Location (local da planta)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "Boiler House")]
    pub name: String,
    pub area: String,
    pub facility: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationPayload {
    #[validate(length(min = 1, max = 200, message = "The location name is required."))]
    pub name: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub area: String,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub facility: String,
}

/// O tenant resolvido para a requisição (organização do usuário + assinatura).
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub organization: Organization,
    pub subscription: Option<Subscription>,
    pub plan: Option<Plan>,
}

impl TenantContext {
    pub fn organization_id(&self) -> Uuid {
        self.organization.id
    }
}

// Visão resumida do tenant para o cliente (GET /api/tenant)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantOverview {
    pub organization: Organization,
    pub subscription: Option<Subscription>,
    pub plan: Option<Plan>,
    pub user_count: i64,
    pub observation_count: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn plan(tier: PlanTier, max_users: Option<i32>, max_observations: Option<i32>) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: format!("{:?}", tier),
            tier,
            max_users,
            max_observations,
            price_monthly: Decimal::ZERO,
            price_onetime: Decimal::ZERO,
            razorpay_plan_id: String::new(),
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_organization_starts_on_active_trial_without_expiry() {
        let free = fixtures::plan(PlanTier::Trial, Some(5), Some(50));
        let sub = Subscription::for_new_organization(Uuid::new_v4(), &free, Utc::now());
        assert_eq!(sub.status, SubscriptionStatus::Trial);
        assert!(sub.is_active);
        assert!(sub.expires_at.is_none());
        assert_eq!(sub.plan_id, free.id);
    }

    #[test]
    fn prices_convert_to_paise() {
        let mut plan = fixtures::plan(PlanTier::Pro, None, None);
        plan.price_monthly = Decimal::new(149_999, 2);
        plan.price_onetime = Decimal::new(14990, 0);
        assert_eq!(plan.monthly_paise(), 149_999);
        assert_eq!(plan.onetime_paise(), 1_499_000);
        assert!(!plan.is_free());
    }

    #[test]
    fn unlimited_quota_is_never_reached() {
        let plan = fixtures::plan(PlanTier::Enterprise, None, None);
        assert!(!plan.user_quota_reached(10_000));

        let plan = fixtures::plan(PlanTier::Trial, Some(5), Some(50));
        assert!(plan.user_quota_reached(5));
        assert!(!plan.observation_quota_reached(49));
        assert!(plan.observation_quota_reached(50));
    }

    #[test]
    fn downgrade_only_touches_active_expired_subscriptions() {
        let free = fixtures::plan(PlanTier::Trial, Some(5), Some(50));
        let pro = fixtures::plan(PlanTier::Pro, None, None);
        let now = Utc::now();

        let mut sub = Subscription::for_new_organization(Uuid::new_v4(), &free, now);
        sub.activate_onetime(&pro, now - Duration::days(400));
        assert!(sub.downgrade_if_expired(&free, now));
        assert_eq!(sub.plan_id, free.id);
        assert!(!sub.is_active);

        // Segunda execução: nada muda
        assert!(!sub.downgrade_if_expired(&free, now));
    }

    #[test]
    fn halted_without_fallback_keeps_plan_but_expires() {
        let pro = fixtures::plan(PlanTier::Pro, None, None);
        let now = Utc::now();
        let mut sub = Subscription::for_new_organization(Uuid::new_v4(), &pro, now);
        sub.halt(None, now);
        assert_eq!(sub.plan_id, pro.id);
        assert_eq!(sub.status, SubscriptionStatus::Expired);
        assert!(!sub.is_active);
    }
}
