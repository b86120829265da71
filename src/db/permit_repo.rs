// src/db/permit_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::{map_unique_violation, PageRequest}, error::AppError},
    models::permit::{Permit, PermitFilter, PermitStatus, StatusCount, WorkTypeCount},
};

#[derive(Clone)]
pub struct PermitRepository {
    pool: PgPool,
}

impl PermitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, permit: &Permit) -> Result<Permit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Permit>(
            r#"
            INSERT INTO permits (
                id, organization_id, permit_number, work_type, title, description,
                location_id, work_area, requestor_id, contractor_name, contractor_contact,
                workers_count, planned_start, planned_end, hazards_identified, risk_controls,
                ppe_required, isolation_required, isolation_details, emergency_procedure,
                toolbox_talk_done, area_barricaded, equipment_inspected, gas_test_done,
                gas_test_result, attachment, status, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
            RETURNING *
            "#,
        )
        .bind(permit.id)
        .bind(permit.organization_id)
        .bind(&permit.permit_number)
        .bind(permit.work_type)
        .bind(&permit.title)
        .bind(&permit.description)
        .bind(permit.location_id)
        .bind(&permit.work_area)
        .bind(permit.requestor_id)
        .bind(&permit.contractor_name)
        .bind(&permit.contractor_contact)
        .bind(permit.workers_count)
        .bind(permit.planned_start)
        .bind(permit.planned_end)
        .bind(&permit.hazards_identified)
        .bind(&permit.risk_controls)
        .bind(&permit.ppe_required)
        .bind(permit.isolation_required)
        .bind(&permit.isolation_details)
        .bind(&permit.emergency_procedure)
        .bind(permit.toolbox_talk_done)
        .bind(permit.area_barricaded)
        .bind(permit.equipment_inspected)
        .bind(permit.gas_test_done)
        .bind(&permit.gas_test_result)
        .bind(&permit.attachment)
        .bind(permit.status)
        .bind(permit.created_at)
        .bind(permit.updated_at)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                AppError::InvalidTransition(format!(
                    "Permit number {} is already taken.",
                    permit.permit_number
                )),
            )
        })
    }

    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Permit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let permit = sqlx::query_as::<_, Permit>(
            "SELECT * FROM permits WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(permit)
    }

    pub async fn find(&self, organization_id: Uuid, id: Uuid) -> Result<Option<Permit>, AppError> {
        let permit = sqlx::query_as::<_, Permit>(
            "SELECT * FROM permits WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(permit)
    }

    /// Grava tudo o que as transições e a edição podem mudar.
    pub async fn save<'e, E>(&self, executor: E, permit: &Permit) -> Result<Permit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, Permit>(
            r#"
            UPDATE permits SET
                work_type = $3, title = $4, description = $5, location_id = $6, work_area = $7,
                contractor_name = $8, contractor_contact = $9, workers_count = $10,
                planned_start = $11, planned_end = $12, actual_start = $13, actual_end = $14,
                hazards_identified = $15, risk_controls = $16, ppe_required = $17,
                isolation_required = $18, isolation_details = $19, emergency_procedure = $20,
                toolbox_talk_done = $21, area_barricaded = $22, equipment_inspected = $23,
                gas_test_done = $24, gas_test_result = $25,
                approved_by_id = $26, approval_comment = $27, rejection_reason = $28, approved_at = $29,
                closure_comment = $30, site_restored = $31, closed_by_id = $32, closed_at = $33,
                attachment = $34, status = $35, updated_at = $36
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(permit.id)
        .bind(permit.organization_id)
        .bind(permit.work_type)
        .bind(&permit.title)
        .bind(&permit.description)
        .bind(permit.location_id)
        .bind(&permit.work_area)
        .bind(&permit.contractor_name)
        .bind(&permit.contractor_contact)
        .bind(permit.workers_count)
        .bind(permit.planned_start)
        .bind(permit.planned_end)
        .bind(permit.actual_start)
        .bind(permit.actual_end)
        .bind(&permit.hazards_identified)
        .bind(&permit.risk_controls)
        .bind(&permit.ppe_required)
        .bind(permit.isolation_required)
        .bind(&permit.isolation_details)
        .bind(&permit.emergency_procedure)
        .bind(permit.toolbox_talk_done)
        .bind(permit.area_barricaded)
        .bind(permit.equipment_inspected)
        .bind(permit.gas_test_done)
        .bind(&permit.gas_test_result)
        .bind(permit.approved_by_id)
        .bind(&permit.approval_comment)
        .bind(&permit.rejection_reason)
        .bind(permit.approved_at)
        .bind(&permit.closure_comment)
        .bind(permit.site_restored)
        .bind(permit.closed_by_id)
        .bind(permit.closed_at)
        .bind(&permit.attachment)
        .bind(permit.status)
        .bind(permit.updated_at)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }

    /// Busca (título, número, empresa, local) + filtros de status/tipo.
    /// `requestor_id` restringe às licenças do próprio solicitante (terceirizados).
    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: &PermitFilter,
        pattern: Option<&str>,
        requestor_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Vec<Permit>, i64), AppError> {
        const FILTER: &str = r#"
            FROM permits p
            JOIN locations l ON l.id = p.location_id
            WHERE p.organization_id = $1
              AND ($2::TEXT IS NULL
                   OR p.title ILIKE $2
                   OR p.permit_number ILIKE $2
                   OR p.contractor_name ILIKE $2
                   OR l.name ILIKE $2)
              AND ($3::permit_status IS NULL OR p.status = $3)
              AND ($4::permit_work_type IS NULL OR p.work_type = $4)
              AND ($5::UUID IS NULL OR p.requestor_id = $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", FILTER))
            .bind(organization_id)
            .bind(pattern)
            .bind(filter.status)
            .bind(filter.work_type)
            .bind(requestor_id)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Permit>(&format!(
            "SELECT p.* {} ORDER BY p.created_at DESC LIMIT $6 OFFSET $7",
            FILTER
        ))
        .bind(organization_id)
        .bind(pattern)
        .bind(filter.status)
        .bind(filter.work_type)
        .bind(requestor_id)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    // =========================================================================
    //  PAINEL
    // =========================================================================

    pub async fn count(&self, organization_id: Uuid) -> Result<i64, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM permits WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn count_by_status(&self, organization_id: Uuid) -> Result<Vec<StatusCount>, AppError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) AS count
            FROM permits WHERE organization_id = $1
            GROUP BY status ORDER BY status
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_work_type(&self, organization_id: Uuid) -> Result<Vec<WorkTypeCount>, AppError> {
        let rows = sqlx::query_as::<_, WorkTypeCount>(
            r#"
            SELECT work_type, COUNT(*) AS count
            FROM permits WHERE organization_id = $1
            GROUP BY work_type ORDER BY count DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_status(
        &self,
        organization_id: Uuid,
        statuses: &[PermitStatus],
    ) -> Result<Vec<Permit>, AppError> {
        let rows = sqlx::query_as::<_, Permit>(
            r#"
            SELECT * FROM permits
            WHERE organization_id = $1 AND status = ANY($2)
            ORDER BY planned_start
            "#,
        )
        .bind(organization_id)
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// APPROVED/ACTIVE com fim planejado no passado.
    pub async fn list_overdue(&self, organization_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Permit>, AppError> {
        let rows = sqlx::query_as::<_, Permit>(
            r#"
            SELECT * FROM permits
            WHERE organization_id = $1
              AND status IN ('APPROVED', 'ACTIVE')
              AND planned_end < $2
            ORDER BY planned_end
            "#,
        )
        .bind(organization_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
