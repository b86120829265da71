// src/services/billing_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    billing::{gateway::PaymentGateway, signature, webhook::WebhookEvent},
    common::error::AppError,
    db::{BillingRepository, TenantRepository},
    models::{
        auth::User,
        billing::{
            checkout_amount, BillingOverview, CheckoutOrder, CreateOrderPayload, PaymentType, PaymentVerified,
            SweepReport, VerifyPaymentPayload,
        },
        tenancy::{Plan, PlanTier, TenantContext},
    },
    services::tenancy_service::ensure_manager,
};

#[derive(Clone)]
pub struct BillingService {
    billing_repo: BillingRepository,
    tenant_repo: TenantRepository,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
    webhook_secret: String,
    pool: PgPool,
}

fn signature_mismatch() -> AppError {
    AppError::InvalidInput("Payment signature verification failed.".into())
}

impl BillingService {
    pub fn new(
        billing_repo: BillingRepository,
        tenant_repo: TenantRepository,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: String,
        webhook_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { billing_repo, tenant_repo, gateway, key_secret, webhook_secret, pool }
    }

    async fn active_plan(&self, plan_id: uuid::Uuid) -> Result<Plan, AppError> {
        self.tenant_repo
            .find_plan(&self.pool, plan_id)
            .await?
            .filter(|plan| plan.active)
            .ok_or_else(|| AppError::ResourceNotFound("Plan".into()))
    }

    pub async fn overview(&self, tenant: TenantContext) -> Result<BillingOverview, AppError> {
        let subscription = tenant
            .subscription
            .ok_or_else(|| AppError::ResourceNotFound("Subscription".into()))?;
        let current_plan = tenant
            .plan
            .ok_or_else(|| AppError::ResourceNotFound("Plan".into()))?;
        let plans = self.tenant_repo.list_active_plans().await?;

        Ok(BillingOverview {
            is_expired: subscription.is_expired(Utc::now()),
            subscription,
            current_plan,
            plans,
        })
    }

    /// Abre o checkout no gateway: pedido (pagamento único) ou assinatura (recorrente).
    pub async fn create_order(
        &self,
        actor: &User,
        tenant: &TenantContext,
        payload: CreateOrderPayload,
    ) -> Result<CheckoutOrder, AppError> {
        ensure_manager(actor, "manage billing")?;
        let plan = self.active_plan(payload.plan_id).await?;
        let organization_id = tenant.organization_id();

        let amount = checkout_amount(&plan, payload.payment_type)?;

        // Pedido (único) ou assinatura (recorrente): o ID do gateway é a referência da tentativa
        let order_reference = match payload.payment_type {
            PaymentType::Onetime => self.gateway.create_order(amount, organization_id, plan.id).await?,
            PaymentType::Recurring => {
                self.gateway
                    .create_subscription(&plan.razorpay_plan_id, organization_id, plan.id)
                    .await?
            }
        };
        self.billing_repo
            .insert_order(organization_id, plan.id, payload.payment_type, &order_reference, amount)
            .await?;

        tracing::info!(
            organization_id = %organization_id,
            plan = %plan.name,
            payment_type = ?payload.payment_type,
            "💳 Checkout aberto ({})",
            order_reference
        );

        Ok(CheckoutOrder {
            payment_type: payload.payment_type,
            order_reference,
            amount,
            plan_name: plan.name,
            org_name: tenant.organization.name.clone(),
            email: actor.email.clone(),
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Confere a assinatura do checkout e, numa transação, marca a tentativa
    /// como paga e promove a assinatura do tenant ao plano registrado nela.
    /// Cada tentativa só é confirmada uma vez.
    pub async fn verify_payment(
        &self,
        actor: &User,
        tenant: &TenantContext,
        payload: VerifyPaymentPayload,
    ) -> Result<PaymentVerified, AppError> {
        ensure_manager(actor, "manage billing")?;
        let organization_id = tenant.organization_id();
        let now = Utc::now();

        let (reference, signed) = match payload.payment_type {
            PaymentType::Onetime => {
                let order_id = payload
                    .razorpay_order_id
                    .as_deref()
                    .ok_or_else(|| AppError::InvalidInput("razorpay_order_id is required.".into()))?;
                let signed = signature::verify_order_payment(
                    &self.key_secret,
                    order_id,
                    &payload.razorpay_payment_id,
                    &payload.razorpay_signature,
                );
                (order_id, signed)
            }
            PaymentType::Recurring => {
                let subscription_id = payload.razorpay_subscription_id.as_deref().ok_or_else(|| {
                    AppError::InvalidInput("razorpay_subscription_id is required.".into())
                })?;
                let signed = signature::verify_subscription_payment(
                    &self.key_secret,
                    &payload.razorpay_payment_id,
                    subscription_id,
                    &payload.razorpay_signature,
                );
                (subscription_id, signed)
            }
        };

        if !signed {
            tracing::warn!(organization_id = %organization_id, "Assinatura de pagamento inválida");
            return Err(signature_mismatch());
        }

        let mut tx = self.pool.begin().await?;

        let order = self
            .billing_repo
            .find_order_for_update(&mut *tx, organization_id, reference)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Order".into()))?;
        order.ensure_payable(payload.payment_type)?;

        self.billing_repo
            .mark_order_paid(
                &mut *tx,
                organization_id,
                reference,
                &payload.razorpay_payment_id,
                &payload.razorpay_signature,
            )
            .await?
            .ok_or_else(|| AppError::InvalidTransition("This payment was already processed.".into()))?;

        let plan = self
            .tenant_repo
            .find_plan(&mut *tx, order.plan_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Plan".into()))?;

        let mut subscription = self
            .tenant_repo
            .find_subscription_by_org(&mut *tx, organization_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Subscription".into()))?;

        match payload.payment_type {
            PaymentType::Recurring => subscription.activate_recurring(&plan, reference, now),
            PaymentType::Onetime => subscription.activate_onetime(&plan, now),
        }
        let subscription = self.tenant_repo.save_subscription(&mut *tx, &subscription).await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %organization_id,
            plan = %plan.name,
            "✅ Pagamento confirmado, assinatura atualizada"
        );

        Ok(PaymentVerified {
            success: true,
            message: format!("Upgraded to {}!", plan.name),
            subscription,
        })
    }

    /// Webhook do gateway. `false` = assinatura inválida (400); qualquer
    /// outra situação é confirmada, erros de processamento só vão para o log.
    pub async fn handle_webhook(&self, raw_body: &[u8], signature_header: &str) -> bool {
        if !signature::verify_webhook(&self.webhook_secret, raw_body, signature_header) {
            tracing::warn!("Webhook com assinatura inválida recusado");
            return false;
        }

        let event = match WebhookEvent::parse(raw_body) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Webhook com corpo inválido: {}", e);
                return true;
            }
        };

        if let Err(e) = self.process_event(&event, Utc::now()).await {
            tracing::error!(?event, "Falha ao processar webhook: {}", e);
        }
        true
    }

    async fn process_event(&self, event: &WebhookEvent, now: DateTime<Utc>) -> Result<(), AppError> {
        let Some(external_id) = event.subscription_id() else {
            tracing::debug!(?event, "Evento de webhook ignorado");
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;

        let Some(mut subscription) = self
            .tenant_repo
            .find_subscription_by_external_id(&mut *tx, external_id)
            .await?
        else {
            tracing::warn!(external_id, "Webhook para assinatura desconhecida");
            return Ok(());
        };

        let fallback = match event {
            WebhookEvent::Halted { .. } => self.tenant_repo.find_plan_by_tier(&mut *tx, PlanTier::Trial).await?,
            _ => None,
        };

        event.apply_to(&mut subscription, fallback.as_ref(), now);
        self.tenant_repo.save_subscription(&mut *tx, &subscription).await?;
        tx.commit().await?;

        tracing::info!(
            organization_id = %subscription.organization_id,
            status = ?subscription.status,
            "Assinatura atualizada pelo webhook"
        );
        Ok(())
    }

    /// Rotina agendada: assinaturas ativas com expiração vencida voltam ao
    /// plano de menor nível. Rodar de novo não muda nada.
    pub async fn downgrade_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let mut tx = self.pool.begin().await?;

        let free_plan = self.tenant_repo.lowest_tier_plan(&mut *tx).await?;
        let expired = self
            .tenant_repo
            .list_expired_active_subscriptions(&mut *tx, now)
            .await?;

        let mut report = SweepReport { total: expired.len(), ..Default::default() };
        for mut subscription in expired {
            if subscription.downgrade_if_expired(&free_plan, now) {
                self.tenant_repo.save_subscription(&mut *tx, &subscription).await?;
                report.changed += 1;
                tracing::info!(
                    organization_id = %subscription.organization_id,
                    "⬇️ Assinatura rebaixada para {}",
                    free_plan.name
                );
            }
        }

        tx.commit().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::gateway::RazorpayClient;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    const WEBHOOK_SECRET: &str = "whsec_test";

    // Banco inalcançável: qualquer acesso falha rápido
    fn service() -> BillingService {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://postgres@127.0.0.1:1/unreachable")
            .unwrap();
        let gateway = RazorpayClient::new("rzp_test_key".into(), "key_secret".into()).unwrap();
        BillingService::new(
            BillingRepository::new(pool.clone()),
            TenantRepository::new(pool.clone()),
            Arc::new(gateway),
            "key_secret".into(),
            WEBHOOK_SECRET.into(),
            pool,
        )
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_refused() {
        let body = br#"{"event":"subscription.charged"}"#;
        let forged = signature::sign("another_secret", body);

        assert!(!service().handle_webhook(body, &forged).await);
        assert!(!service().handle_webhook(body, "").await);
    }

    #[tokio::test]
    async fn webhook_with_malformed_body_is_acknowledged() {
        let body = b"not json at all";
        let signed = signature::sign(WEBHOOK_SECRET, body);

        assert!(service().handle_webhook(body, &signed).await);
    }

    #[tokio::test]
    async fn webhook_processing_failure_is_acknowledged() {
        let body = serde_json::to_vec(&serde_json::json!({
            "event": "subscription.charged",
            "payload": { "subscription": { "entity": { "id": "sub_Q1" } } }
        }))
        .unwrap();
        let signed = signature::sign(WEBHOOK_SECRET, &body);

        // Falha de banco só vai para o log
        assert!(service().handle_webhook(&body, &signed).await);
    }

    #[tokio::test]
    async fn verify_rejects_forged_signature_before_touching_the_database() {
        use crate::models::{
            auth::{Role, RoleSet},
            tenancy::{Organization, TenantContext},
        };

        let now = Utc::now();
        let organization = Organization {
            id: uuid::Uuid::new_v4(),
            name: "Acme".into(),
            domain: "acme".into(),
            created_at: now,
        };
        let manager = User::new(
            "owner@acme.test",
            "Owner",
            String::new(),
            Some(organization.id),
            RoleSet::of(&[Role::Manager]),
            now,
        );
        let tenant = TenantContext { organization, subscription: None, plan: None };

        let payload = VerifyPaymentPayload {
            payment_type: PaymentType::Recurring,
            razorpay_payment_id: "pay_Y".into(),
            razorpay_signature: signature::sign("not_the_key", b"pay_Y|sub_X"),
            razorpay_order_id: None,
            razorpay_subscription_id: Some("sub_X".into()),
        };

        let err = service().verify_payment(&manager, &tenant, payload).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
