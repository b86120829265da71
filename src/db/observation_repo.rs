// src/db/observation_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::PageRequest, error::AppError},
    models::observation::{Observation, ObservationDashboard, OverdueObservation},
};

#[derive(Clone)]
pub struct ObservationRepository {
    pool: PgPool,
}

impl ObservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, obs: &Observation) -> Result<Observation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Observation>(
            r#"
            INSERT INTO observations (
                id, organization_id, location_id, observer_id, date_observed,
                title, description, severity, photo_before, assigned_to_id,
                status, target_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(obs.id)
        .bind(obs.organization_id)
        .bind(obs.location_id)
        .bind(obs.observer_id)
        .bind(obs.date_observed)
        .bind(&obs.title)
        .bind(&obs.description)
        .bind(obs.severity)
        .bind(&obs.photo_before)
        .bind(obs.assigned_to_id)
        .bind(obs.status)
        .bind(obs.target_date)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    /// Busca sempre filtrando pelo tenant; `FOR UPDATE` porque é seguida de uma transição.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Observation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let obs = sqlx::query_as::<_, Observation>(
            "SELECT * FROM observations WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(obs)
    }

    pub async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Observation>, AppError> {
        let obs = sqlx::query_as::<_, Observation>(
            "SELECT * FROM observations WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(obs)
    }

    /// Persiste os campos mutáveis pelas transições do workflow.
    pub async fn save<'e, E>(&self, executor: E, obs: &Observation) -> Result<Observation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, Observation>(
            r#"
            UPDATE observations SET
                assigned_to_id = $3, status = $4, target_date = $5,
                rectification_details = $6, photo_after = $7, date_closed = $8,
                verification_comment = $9, is_archived = $10
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(obs.id)
        .bind(obs.organization_id)
        .bind(obs.assigned_to_id)
        .bind(obs.status)
        .bind(obs.target_date)
        .bind(&obs.rectification_details)
        .bind(&obs.photo_after)
        .bind(obs.date_closed)
        .bind(&obs.verification_comment)
        .bind(obs.is_archived)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM observations WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ResourceNotFound("Observation".into()));
        }
        Ok(())
    }

    /// Base da cota do plano: observações não arquivadas.
    pub async fn count_active<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM observations WHERE organization_id = $1 AND NOT is_archived",
        )
        .bind(organization_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Listagem paginada com busca em título, descrição, local e observador.
    pub async fn list(
        &self,
        organization_id: Uuid,
        archived: bool,
        pattern: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Observation>, i64), AppError> {
        const FILTER: &str = r#"
            FROM observations o
            JOIN locations l ON l.id = o.location_id
            LEFT JOIN users u ON u.id = o.observer_id
            WHERE o.organization_id = $1
              AND o.is_archived = $2
              AND ($3::TEXT IS NULL
                   OR o.title ILIKE $3
                   OR o.description ILIKE $3
                   OR l.name ILIKE $3
                   OR u.email ILIKE $3
                   OR u.full_name ILIKE $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", FILTER))
            .bind(organization_id)
            .bind(archived)
            .bind(pattern)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Observation>(&format!(
            "SELECT o.* {} ORDER BY o.date_observed DESC LIMIT $4 OFFSET $5",
            FILTER
        ))
        .bind(organization_id)
        .bind(archived)
        .bind(pattern)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn dashboard(&self, organization_id: Uuid, today: NaiveDate) -> Result<ObservationDashboard, AppError> {
        let dashboard = sqlx::query_as::<_, ObservationDashboard>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status IN ('OPEN', 'IN_PROGRESS')) AS open,
                COUNT(*) FILTER (WHERE status = 'CLOSED') AS closed,
                COUNT(*) FILTER (WHERE target_date < $2 AND status <> 'CLOSED') AS overdue,
                COUNT(*) FILTER (WHERE severity = 'HIGH' AND status <> 'CLOSED') AS high_severity_open
            FROM observations
            WHERE organization_id = $1 AND NOT is_archived
            "#,
        )
        .bind(organization_id)
        .bind(today)
        .fetch_one(&self.pool)
        .await?;
        Ok(dashboard)
    }

    /// Todas as organizações: alvo vencido, com responsável, não arquivada,
    /// fora de CLOSED/AWAITING_VERIFICATION.
    pub async fn list_overdue(&self, today: NaiveDate) -> Result<Vec<OverdueObservation>, AppError> {
        let rows = sqlx::query_as::<_, OverdueObservation>(
            r#"
            SELECT
                o.*,
                u.email AS assignee_email,
                u.full_name AS assignee_name,
                l.name AS location_name
            FROM observations o
            JOIN users u ON u.id = o.assigned_to_id
            JOIN locations l ON l.id = o.location_id
            WHERE o.target_date < $1
              AND NOT o.is_archived
              AND o.status NOT IN ('CLOSED', 'AWAITING_VERIFICATION')
            ORDER BY o.organization_id, o.target_date
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
