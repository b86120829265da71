// src/db/tenancy_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{map_restrict_violation, map_unique_violation},
        error::AppError,
    },
    models::tenancy::{Location, Organization, Plan, PlanTier, Subscription},
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ORGANIZAÇÕES
    // =========================================================================

    pub async fn create_organization<'e, E>(
        &self,
        executor: E,
        name: &str,
        domain: &str,
    ) -> Result<Organization, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (name, domain) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(domain.trim().to_lowercase())
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, AppError::DomainAlreadyExists))
    }

    pub async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        let org = sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(org)
    }

    // =========================================================================
    //  PLANOS
    // =========================================================================

    /// Plano de menor nível (o enum `plan_tier` ordena trial < basic < pro < enterprise).
    pub async fn lowest_tier_plan<'e, E>(&self, executor: E) -> Result<Plan, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE active ORDER BY tier ASC, price_monthly ASC LIMIT 1",
        )
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("Nenhum plano ativo cadastrado")))
    }

    pub async fn find_plan_by_tier<'e, E>(&self, executor: E, tier: PlanTier) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE tier = $1 ORDER BY price_monthly ASC LIMIT 1",
        )
        .bind(tier)
        .fetch_optional(executor)
        .await?;
        Ok(plan)
    }

    pub async fn find_plan<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Plan>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(plan)
    }

    pub async fn list_active_plans(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE active ORDER BY price_monthly ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    // =========================================================================
    //  ASSINATURAS
    // =========================================================================

    pub async fn insert_subscription<'e, E>(
        &self,
        executor: E,
        sub: &Subscription,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, organization_id, plan_id, status, is_active, started_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(sub.id)
        .bind(sub.organization_id)
        .bind(sub.plan_id)
        .bind(sub.status)
        .bind(sub.is_active)
        .bind(sub.started_at)
        .bind(sub.expires_at)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    /// `FOR UPDATE`: chamado dentro da transação que vai alterar a assinatura.
    pub async fn find_subscription_by_org<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sub = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE organization_id = $1 FOR UPDATE",
        )
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(sub)
    }

    /// Trava a assinatura do tenant até o fim da transação (serializa checagens de cota).
    pub async fn lock_subscription<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT id FROM subscriptions WHERE organization_id = $1 FOR UPDATE")
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(())
    }

    /// Leitura simples (sem trava) para a resolução do tenant.
    pub async fn subscription_of(&self, organization_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sub)
    }

    pub async fn find_subscription_by_external_id<'e, E>(
        &self,
        executor: E,
        razorpay_subscription_id: &str,
    ) -> Result<Option<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sub = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE razorpay_subscription_id = $1 AND razorpay_subscription_id <> ''
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(razorpay_subscription_id)
        .fetch_optional(executor)
        .await?;
        Ok(sub)
    }

    pub async fn save_subscription<'e, E>(
        &self,
        executor: E,
        sub: &Subscription,
    ) -> Result<Subscription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions SET
                plan_id = $2, status = $3, is_active = $4, started_at = $5, expires_at = $6,
                razorpay_customer_id = $7, razorpay_subscription_id = $8, updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(sub.id)
        .bind(sub.plan_id)
        .bind(sub.status)
        .bind(sub.is_active)
        .bind(sub.started_at)
        .bind(sub.expires_at)
        .bind(&sub.razorpay_customer_id)
        .bind(&sub.razorpay_subscription_id)
        .bind(sub.updated_at)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }

    /// Ativas com expiração já vencida (rotina de rebaixamento).
    pub async fn list_expired_active_subscriptions<'e, E>(
        &self,
        executor: E,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subs = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE is_active AND expires_at IS NOT NULL AND expires_at < $1
            ORDER BY expires_at
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(now)
        .fetch_all(executor)
        .await?;
        Ok(subs)
    }

    // =========================================================================
    //  LOCAIS
    // =========================================================================

    pub async fn create_location<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
        area: &str,
        facility: &str,
    ) -> Result<Location, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let location = sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations (organization_id, name, area, facility)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(area)
        .bind(facility)
        .fetch_one(executor)
        .await?;
        Ok(location)
    }

    pub async fn list_locations(&self, organization_id: Uuid) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE organization_id = $1 ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    pub async fn find_location(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT * FROM locations WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    /// Local referenciado por observações/licenças não pode ser apagado.
    pub async fn delete_location(&self, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM locations WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_restrict_violation(e, "Location"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound("Location".into()));
        }
        Ok(())
    }
}
