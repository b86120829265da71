// src/db/billing_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{PaymentType, RazorpayOrder},
};

#[derive(Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registra a tentativa de pagamento (status `created`).
    pub async fn insert_order(
        &self,
        organization_id: Uuid,
        plan_id: Uuid,
        payment_type: PaymentType,
        razorpay_order_id: &str,
        amount_paise: i64,
    ) -> Result<RazorpayOrder, AppError> {
        let order = sqlx::query_as::<_, RazorpayOrder>(
            r#"
            INSERT INTO razorpay_orders (organization_id, plan_id, payment_type, razorpay_order_id, amount_paise)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(plan_id)
        .bind(payment_type)
        .bind(razorpay_order_id)
        .bind(amount_paise)
        .fetch_one(&self.pool)
        .await?;
        Ok(order)
    }

    /// Tentativa de pagamento do tenant, travada até o fim da transação.
    pub async fn find_order_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        razorpay_order_id: &str,
    ) -> Result<Option<RazorpayOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, RazorpayOrder>(
            "SELECT * FROM razorpay_orders WHERE organization_id = $1 AND razorpay_order_id = $2 FOR UPDATE",
        )
        .bind(organization_id)
        .bind(razorpay_order_id)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    /// Marca como pago um pedido ainda em aberto. `None` se não existe ou já foi processado.
    pub async fn mark_order_paid<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        razorpay_order_id: &str,
        razorpay_payment_id: &str,
        razorpay_signature: &str,
    ) -> Result<Option<RazorpayOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, RazorpayOrder>(
            r#"
            UPDATE razorpay_orders SET
                razorpay_payment_id = $3, razorpay_signature = $4,
                status = 'paid', updated_at = NOW()
            WHERE organization_id = $1 AND razorpay_order_id = $2 AND status = 'created'
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(razorpay_order_id)
        .bind(razorpay_payment_id)
        .bind(razorpay_signature)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }
}
