// src/billing/gateway.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::common::error::AppError;

const RAZORPAY_API: &str = "https://api.razorpay.com/v1";
const CURRENCY: &str = "INR";
/// Ciclos de cobrança de uma assinatura recorrente (12 meses).
pub const RECURRING_TOTAL_COUNT: u32 = 12;

// Só o que usamos da resposta do gateway
#[derive(Debug, Deserialize)]
struct CreatedEntity {
    id: String,
}

/// O gateway de pagamento, atrás de um trait para poder ser trocado nos testes.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Cria um pedido de pagamento único e devolve o ID do pedido.
    async fn create_order(
        &self,
        amount_paise: i64,
        organization_id: Uuid,
        plan_id: Uuid,
    ) -> Result<String, AppError>;

    /// Cria uma assinatura recorrente para o plano externo e devolve o ID.
    async fn create_subscription(
        &self,
        external_plan_id: &str,
        organization_id: Uuid,
        plan_id: Uuid,
    ) -> Result<String, AppError>;

    /// Chave pública entregue ao checkout do front-end.
    fn key_id(&self) -> &str;
}

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| anyhow::anyhow!("Falha ao criar o cliente HTTP do gateway: {}", e))?;

        Ok(Self { client, key_id, key_secret })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, AppError> {
        let url = format!("{}{}", RAZORPAY_API, path);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("payment gateway unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(%status, path, "Gateway recusou a requisição: {}", error_text);
            return Err(AppError::ExternalService(format!(
                "payment gateway returned {}",
                status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ExternalService(format!("invalid gateway response: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount_paise: i64,
        organization_id: Uuid,
        plan_id: Uuid,
    ) -> Result<String, AppError> {
        let body = json!({
            "amount": amount_paise,
            "currency": CURRENCY,
            "receipt": format!("org_{}_plan_{}", organization_id.simple(), plan_id.simple()),
            "notes": {
                "organization_id": organization_id,
                "plan_id": plan_id,
                "payment_type": "onetime",
            },
        });

        let order: CreatedEntity = self.post("/orders", body).await?;
        Ok(order.id)
    }

    async fn create_subscription(
        &self,
        external_plan_id: &str,
        organization_id: Uuid,
        plan_id: Uuid,
    ) -> Result<String, AppError> {
        let body = json!({
            "plan_id": external_plan_id,
            "total_count": RECURRING_TOTAL_COUNT,
            "quantity": 1,
            "customer_notify": 1,
            "notes": {
                "organization_id": organization_id,
                "plan_id": plan_id,
            },
        });

        let subscription: CreatedEntity = self.post("/subscriptions", body).await?;
        Ok(subscription.id)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
