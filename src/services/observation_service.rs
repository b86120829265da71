// src/services/observation_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{Page, PageRequest, SearchParams},
        error::AppError,
    },
    db::{ObservationRepository, TenantRepository, UserRepository},
    models::{
        auth::User,
        billing::SweepReport,
        observation::{
            AssignObservationPayload, CreateObservationPayload, Observation, ObservationCreated,
            ObservationDashboard, OverdueObservation, RectifyObservationPayload, Severity,
            VerifyObservationPayload,
        },
        tenancy::TenantContext,
    },
    notify::{Notification, Notifier},
    workflow::observation as workflow,
};

/// Itens por página nas listagens de observações.
pub const OBSERVATIONS_PER_PAGE: i64 = 10;

#[derive(Clone)]
pub struct ObservationService {
    observation_repo: ObservationRepository,
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    notifier: Arc<dyn Notifier>,
    site_url: String,
    pool: PgPool,
}

impl ObservationService {
    pub fn new(
        observation_repo: ObservationRepository,
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        notifier: Arc<dyn Notifier>,
        site_url: String,
        pool: PgPool,
    ) -> Self {
        Self { observation_repo, tenant_repo, user_repo, notifier, site_url, pool }
    }

    fn detail_url(&self, id: Uuid) -> String {
        format!("{}/observations/{}", self.site_url, id)
    }

    async fn tenant_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_in_organization(organization_id, user_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("User".into()))
    }

    /// Registro de uma observação. Cota do plano checada com a assinatura
    /// travada, então criações simultâneas do mesmo tenant não furam o limite.
    pub async fn create(
        &self,
        actor: &User,
        tenant: &TenantContext,
        payload: CreateObservationPayload,
    ) -> Result<ObservationCreated, AppError> {
        workflow::ensure_observation_access(actor)?;
        let organization_id = tenant.organization_id();

        let location = self
            .tenant_repo
            .find_location(organization_id, payload.location_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Location".into()))?;

        let assignee = match payload.assigned_to_id {
            Some(id) => Some(self.tenant_member(organization_id, id).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        self.tenant_repo.lock_subscription(&mut *tx, organization_id).await?;
        let active = self.observation_repo.count_active(&mut *tx, organization_id).await?;
        workflow::ensure_can_create(actor, tenant.plan.as_ref(), active)?;

        let observation = payload.into_observation(organization_id, actor.id, Utc::now());
        let observation = self.observation_repo.insert(&mut *tx, &observation).await?;

        tx.commit().await?;

        tracing::info!(
            observation_id = %observation.id,
            severity = ?observation.severity,
            "Observação registrada em '{}'",
            location.name
        );

        // Alerta imediato: HIGH com responsável. Nunca desfaz o registro.
        let mut warnings = Vec::new();
        if let (Severity::High, Some(assignee)) = (observation.severity, assignee) {
            let alert = Notification::HighRiskAlert {
                recipient_name: assignee.display_name().to_string(),
                observation_id: observation.id,
                title: observation.title.clone(),
                location: location.name.clone(),
                target_date: observation.target_date,
                description: observation.description.clone(),
                detail_url: self.detail_url(observation.id),
            };
            if !self.notifier.send_notification(&assignee.email, &alert).await {
                warnings.push(format!(
                    "Observation saved, but the high-risk alert to {} could not be sent.",
                    assignee.email
                ));
            }
        }

        Ok(ObservationCreated { observation, warnings })
    }

    /// Carrega (travando) a observação do tenant, aplica a transição e grava.
    async fn transition<F>(&self, organization_id: Uuid, id: Uuid, apply: F) -> Result<Observation, AppError>
    where
        F: FnOnce(&mut Observation) -> Result<(), AppError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut observation = self
            .observation_repo
            .find_for_update(&mut *tx, organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Observation".into()))?;

        let before = observation.status;
        apply(&mut observation)?;
        let saved = self.observation_repo.save(&mut *tx, &observation).await?;

        tx.commit().await?;

        if before != saved.status {
            tracing::info!(observation_id = %saved.id, from = ?before, to = ?saved.status, "Observação mudou de status");
        }
        Ok(saved)
    }

    pub async fn assign(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        payload: AssignObservationPayload,
    ) -> Result<Observation, AppError> {
        let assignee = self.tenant_member(organization_id, payload.assigned_to_id).await?;
        self.transition(organization_id, id, |obs| {
            workflow::assign(obs, actor, &assignee, payload.target_date)
        })
        .await
    }

    pub async fn rectify(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        payload: RectifyObservationPayload,
    ) -> Result<Observation, AppError> {
        self.transition(organization_id, id, |obs| {
            workflow::rectify(obs, actor, payload.rectification_details, payload.photo_after)
        })
        .await
    }

    pub async fn verify(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        payload: VerifyObservationPayload,
    ) -> Result<Observation, AppError> {
        self.transition(organization_id, id, |obs| {
            workflow::verify(obs, actor, payload.action, payload.comment, Utc::now())
        })
        .await
    }

    pub async fn set_archived(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        archived: bool,
    ) -> Result<Observation, AppError> {
        self.transition(organization_id, id, |obs| workflow::set_archived(obs, actor, archived))
            .await
    }

    pub async fn delete(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        workflow::ensure_can_delete(actor)?;
        self.observation_repo.delete(&self.pool, organization_id, id).await?;
        tracing::info!(observation_id = %id, "🗑️ Observação excluída");
        Ok(())
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list(
        &self,
        actor: &User,
        organization_id: Uuid,
        archived: bool,
        params: SearchParams,
    ) -> Result<Page<Observation>, AppError> {
        workflow::ensure_observation_access(actor)?;
        let page = PageRequest::new(params.page, OBSERVATIONS_PER_PAGE);
        let pattern = params.pattern();

        let (items, total) = self
            .observation_repo
            .list(organization_id, archived, pattern.as_deref(), page)
            .await?;
        Ok(Page::new(items, page, total))
    }

    pub async fn detail(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<Observation, AppError> {
        workflow::ensure_observation_access(actor)?;
        self.observation_repo
            .find(organization_id, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Observation".into()))
    }

    pub async fn dashboard(&self, actor: &User, organization_id: Uuid) -> Result<ObservationDashboard, AppError> {
        workflow::ensure_observation_access(actor)?;
        self.observation_repo
            .dashboard(organization_id, Utc::now().date_naive())
            .await
    }

    // =========================================================================
    //  ROTINA DIÁRIA
    // =========================================================================

    pub fn overdue_alert(&self, row: &OverdueObservation, today: NaiveDate) -> Notification {
        let obs = &row.observation;
        Notification::OverdueAlert {
            recipient_name: if row.assignee_name.is_empty() {
                row.assignee_email.clone()
            } else {
                row.assignee_name.clone()
            },
            observation_id: obs.id,
            title: obs.title.clone(),
            location: row.location_name.clone(),
            severity: obs.severity,
            status: obs.status,
            target_date: obs.target_date.unwrap_or(today),
            days_overdue: obs.days_overdue(today),
            detail_url: self.detail_url(obs.id),
        }
    }

    /// Alerta cada responsável por observação atrasada (todas as organizações).
    /// Em `dry_run` só conta. Sem marcação de "já avisado": roda uma vez por dia.
    pub async fn send_overdue_alerts(&self, today: NaiveDate, dry_run: bool) -> Result<SweepReport, AppError> {
        let rows = self.observation_repo.list_overdue(today).await?;
        let mut report = SweepReport { total: rows.len(), ..Default::default() };

        for row in rows.iter().filter(|r| r.observation.needs_overdue_alert(today)) {
            if dry_run {
                tracing::info!(
                    observation_id = %row.observation.id,
                    "[dry-run] alerta de atraso para {}",
                    row.assignee_email
                );
                continue;
            }

            let alert = self.overdue_alert(row, today);
            if self.notifier.send_notification(&row.assignee_email, &alert).await {
                report.changed += 1;
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::observation::fixtures::observation, notify::LogNotifier};
    use sqlx::postgres::PgPoolOptions;

    fn service() -> ObservationService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        ObservationService::new(
            ObservationRepository::new(pool.clone()),
            TenantRepository::new(pool.clone()),
            UserRepository::new(pool.clone()),
            Arc::new(LogNotifier),
            "https://safety.acme.test".into(),
            pool,
        )
    }

    #[tokio::test]
    async fn overdue_alert_counts_days_and_falls_back_to_email() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 14).unwrap();
        let mut obs = observation(Uuid::new_v4(), Some(Uuid::new_v4()));
        obs.target_date = NaiveDate::from_ymd_opt(2026, 5, 10);

        let row = OverdueObservation {
            observation: obs.clone(),
            assignee_email: "owner@acme.test".into(),
            assignee_name: String::new(),
            location_name: "Pump house".into(),
        };

        match service().overdue_alert(&row, today) {
            Notification::OverdueAlert { recipient_name, days_overdue, detail_url, .. } => {
                assert_eq!(recipient_name, "owner@acme.test");
                assert_eq!(days_overdue, 4);
                assert_eq!(detail_url, format!("https://safety.acme.test/observations/{}", obs.id));
            }
            other => panic!("unexpected notification {:?}", other),
        }
    }
}
