// src/models/billing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::tenancy::{Plan, Subscription},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    #[default]
    Onetime,
    Recurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "razorpay_order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Created,
    Paid,
    Failed,
}

// Uma linha por tentativa de pagamento
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub plan_id: Uuid,
    pub payment_type: PaymentType,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub razorpay_signature: String,
    pub amount_paise: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RazorpayOrder {
    /// Só a tentativa em aberto, do mesmo tipo do checkout, pode ser confirmada.
    /// O plano vale o que foi registrado aqui, nunca o que vem do cliente.
    pub fn ensure_payable(&self, payment_type: PaymentType) -> Result<(), AppError> {
        if self.payment_type != payment_type {
            return Err(AppError::InvalidInput(
                "The payment does not match the checkout that was opened.".into(),
            ));
        }
        if self.status != OrderStatus::Created {
            return Err(AppError::InvalidTransition("This payment was already processed.".into()));
        }
        Ok(())
    }
}

/// Valor (em paise) do checkout do plano. Erro quando o plano não tem preço
/// configurado para o tipo pedido.
pub fn checkout_amount(plan: &Plan, payment_type: PaymentType) -> Result<i64, AppError> {
    match payment_type {
        PaymentType::Onetime => {
            let amount = plan.onetime_paise();
            if amount <= 0 {
                return Err(AppError::InvalidInput(format!(
                    "The {} plan has no one-time price.",
                    plan.name
                )));
            }
            Ok(amount)
        }
        PaymentType::Recurring => {
            let amount = plan.monthly_paise();
            if !plan.supports_recurring() || amount <= 0 {
                return Err(AppError::InvalidInput(format!(
                    "The {} plan is not available as a monthly subscription.",
                    plan.name
                )));
            }
            Ok(amount)
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub plan_id: Uuid,
    #[serde(default)]
    pub payment_type: PaymentType,
}

// O que o checkout do front-end precisa para abrir o gateway
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOrder {
    pub payment_type: PaymentType,
    /// ID do pedido (único) ou da assinatura (recorrente) no gateway
    pub order_reference: String,
    pub amount: i64,
    pub plan_name: String,
    pub org_name: String,
    pub email: String,
    pub key_id: String,
}

// Payload devolvido pelo checkout após o pagamento (nomes do gateway)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyPaymentPayload {
    #[serde(default)]
    pub payment_type: PaymentType,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub razorpay_order_id: Option<String>,
    pub razorpay_subscription_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerified {
    pub success: bool,
    pub message: String,
    pub subscription: Subscription,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingOverview {
    pub subscription: Subscription,
    pub current_plan: Plan,
    pub is_expired: bool,
    pub plans: Vec<Plan>,
}

// Resultado das rotinas agendadas
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub total: usize,
    pub changed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(payment_type: PaymentType, status: OrderStatus) -> RazorpayOrder {
        let now = Utc::now();
        RazorpayOrder {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            payment_type,
            razorpay_order_id: "order_Q1".into(),
            razorpay_payment_id: String::new(),
            razorpay_signature: String::new(),
            amount_paise: 99_900,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_checkout_is_payable() {
        assert!(order(PaymentType::Onetime, OrderStatus::Created).ensure_payable(PaymentType::Onetime).is_ok());
        assert!(order(PaymentType::Recurring, OrderStatus::Created).ensure_payable(PaymentType::Recurring).is_ok());
    }

    #[test]
    fn paid_order_cannot_be_confirmed_again() {
        let err = order(PaymentType::Onetime, OrderStatus::Paid)
            .ensure_payable(PaymentType::Onetime)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn payment_type_must_match_the_checkout() {
        let err = order(PaymentType::Onetime, OrderStatus::Created)
            .ensure_payable(PaymentType::Recurring)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
