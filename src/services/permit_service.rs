// src/services/permit_service.rs

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{Page, PageRequest, SearchParams},
        error::AppError,
    },
    db::{PermitRepository, PermitSequence, TenantRepository, UserRepository},
    models::{
        auth::User,
        permit::{
            day_prefix, format_permit_number, ActivatePermitPayload, ClosePermitPayload, Permit,
            PermitDashboard, PermitFilter, PermitPayload, PermitStatus, PermitView,
            ReviewPermitPayload, PERMIT_PREFIX,
        },
        tenancy::TenantContext,
    },
    services::document_service::{DocumentService, PermitSheet},
    workflow::permit as workflow,
};

/// Itens por página na listagem de licenças.
pub const PERMITS_PER_PAGE: i64 = 15;

/// Próximo número livre do dia: PTW-YYYYMMDD-NNNN.
pub async fn next_permit_number(
    sequence: &dyn PermitSequence,
    today: chrono::NaiveDate,
) -> Result<String, AppError> {
    let prefix = day_prefix(PERMIT_PREFIX, today);
    let value = sequence.next_value(&prefix).await?;
    Ok(format_permit_number(&prefix, value))
}

#[derive(Clone)]
pub struct PermitService {
    permit_repo: PermitRepository,
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    sequence: Arc<dyn PermitSequence>,
    document_service: DocumentService,
    pool: PgPool,
}

impl PermitService {
    pub fn new(
        permit_repo: PermitRepository,
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        sequence: Arc<dyn PermitSequence>,
        document_service: DocumentService,
        pool: PgPool,
    ) -> Self {
        Self { permit_repo, tenant_repo, user_repo, sequence, document_service, pool }
    }

    async fn ensure_location(&self, organization_id: Uuid, location_id: Uuid) -> Result<String, AppError> {
        self.tenant_repo
            .find_location(organization_id, location_id)
            .await?
            .map(|location| location.name)
            .ok_or_else(|| AppError::ResourceNotFound("Location".into()))
    }

    /// Rascunho novo com número sequencial do dia. Qualquer membro
    /// (inclusive terceirizado) pode solicitar.
    pub async fn create(&self, actor: &User, tenant: &TenantContext, payload: PermitPayload) -> Result<PermitView, AppError> {
        let organization_id = tenant.organization_id();
        self.ensure_location(organization_id, payload.location_id).await?;

        let now = Utc::now();
        let permit_number = next_permit_number(self.sequence.as_ref(), now.date_naive()).await?;

        let permit = payload.into_draft(organization_id, actor.id, permit_number, now);
        let permit = self.permit_repo.insert(&self.pool, &permit).await?;

        tracing::info!(
            permit_id = %permit.id,
            work_type = ?permit.work_type,
            "📝 Licença {} criada",
            permit.permit_number
        );
        Ok(PermitView::new(permit, now))
    }

    /// Carrega (travando) a licença visível ao ator, aplica a transição e grava.
    async fn transition<F>(&self, actor: &User, organization_id: Uuid, id: Uuid, apply: F) -> Result<PermitView, AppError>
    where
        F: FnOnce(&mut Permit) -> Result<(), AppError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut permit = self
            .permit_repo
            .find_for_update(&mut *tx, organization_id, id)
            .await?
            .filter(|permit| workflow::can_view(permit, actor))
            .ok_or_else(|| AppError::ResourceNotFound("Permit".into()))?;

        let before = permit.status;
        apply(&mut permit)?;
        let saved = self.permit_repo.save(&mut *tx, &permit).await?;

        tx.commit().await?;

        if before != saved.status {
            tracing::info!(
                permit_number = %saved.permit_number,
                from = ?before,
                to = ?saved.status,
                "Licença mudou de status"
            );
        }
        Ok(PermitView::new(saved, Utc::now()))
    }

    pub async fn edit(&self, actor: &User, organization_id: Uuid, id: Uuid, payload: PermitPayload) -> Result<PermitView, AppError> {
        self.ensure_location(organization_id, payload.location_id).await?;
        self.transition(actor, organization_id, id, |permit| {
            workflow::edit(permit, actor, payload, Utc::now())
        })
        .await
    }

    pub async fn submit(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<PermitView, AppError> {
        self.transition(actor, organization_id, id, |permit| workflow::submit(permit, actor, Utc::now()))
            .await
    }

    pub async fn review(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        payload: ReviewPermitPayload,
    ) -> Result<PermitView, AppError> {
        self.transition(actor, organization_id, id, |permit| {
            workflow::review(permit, actor, payload, Utc::now())
        })
        .await
    }

    pub async fn activate(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        payload: ActivatePermitPayload,
    ) -> Result<PermitView, AppError> {
        self.transition(actor, organization_id, id, |permit| {
            workflow::activate(permit, actor, payload, Utc::now())
        })
        .await
    }

    pub async fn close(
        &self,
        actor: &User,
        organization_id: Uuid,
        id: Uuid,
        payload: ClosePermitPayload,
    ) -> Result<PermitView, AppError> {
        self.transition(actor, organization_id, id, |permit| {
            workflow::close(permit, actor, payload, Utc::now())
        })
        .await
    }

    pub async fn cancel(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<PermitView, AppError> {
        self.transition(actor, organization_id, id, |permit| workflow::cancel(permit, actor, Utc::now()))
            .await
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Terceirizados só recebem as próprias solicitações.
    pub async fn list(&self, actor: &User, organization_id: Uuid, filter: PermitFilter) -> Result<Page<PermitView>, AppError> {
        let page = PageRequest::new(filter.page, PERMITS_PER_PAGE);
        let pattern = SearchParams { q: filter.q.clone(), page: filter.page }.pattern();
        let requestor_only = actor.is_contractor().then_some(actor.id);

        let (items, total) = self
            .permit_repo
            .list(organization_id, &filter, pattern.as_deref(), requestor_only, page)
            .await?;

        let now = Utc::now();
        let items = items.into_iter().map(|p| PermitView::new(p, now)).collect();
        Ok(Page::new(items, page, total))
    }

    async fn visible(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<Permit, AppError> {
        self.permit_repo
            .find(organization_id, id)
            .await?
            .filter(|permit| workflow::can_view(permit, actor))
            .ok_or_else(|| AppError::ResourceNotFound("Permit".into()))
    }

    pub async fn detail(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<PermitView, AppError> {
        let permit = self.visible(actor, organization_id, id).await?;
        Ok(PermitView::new(permit, Utc::now()))
    }

    /// Painel do tenant inteiro (fora do alcance de terceirizados).
    pub async fn dashboard(&self, actor: &User, organization_id: Uuid) -> Result<PermitDashboard, AppError> {
        if actor.is_contractor() {
            return Err(AppError::Authorization(
                "Contractors can only see their own permit requests.".into(),
            ));
        }

        let now = Utc::now();
        let views = |permits: Vec<Permit>| -> Vec<PermitView> {
            permits.into_iter().map(|p| PermitView::new(p, now)).collect()
        };

        let total = self.permit_repo.count(organization_id).await?;
        let by_status = self.permit_repo.count_by_status(organization_id).await?;
        let by_type = self.permit_repo.count_by_work_type(organization_id).await?;
        let overdue = self.permit_repo.list_overdue(organization_id, now).await?;
        let pending = self
            .permit_repo
            .list_by_status(organization_id, &[PermitStatus::Submitted])
            .await?;
        let active = self
            .permit_repo
            .list_by_status(organization_id, &[PermitStatus::Active])
            .await?;

        Ok(PermitDashboard {
            total,
            by_status,
            by_type,
            overdue: views(overdue),
            pending_approval: views(pending),
            active: views(active),
        })
    }

    /// PDF imprimível com QR Code do número.
    pub async fn pdf(&self, actor: &User, tenant: &TenantContext, id: Uuid) -> Result<(String, Vec<u8>), AppError> {
        let organization_id = tenant.organization_id();
        let permit = self.visible(actor, organization_id, id).await?;

        let location_name = self.ensure_location(organization_id, permit.location_id).await?;
        let requestor_name = self
            .user_repo
            .find_in_organization(organization_id, permit.requestor_id)
            .await?
            .map(|u| u.display_name().to_string())
            .unwrap_or_default();
        let approver_name = match permit.approved_by_id {
            Some(approver) => self
                .user_repo
                .find_in_organization(organization_id, approver)
                .await?
                .map(|u| u.display_name().to_string()),
            None => None,
        };

        let permit_number = permit.permit_number.clone();
        let bytes = self
            .document_service
            .permit_pdf(PermitSheet {
                permit,
                organization_name: tenant.organization.name.clone(),
                location_name,
                requestor_name,
                approver_name,
            })
            .await?;

        Ok((permit_number, bytes))
    }
}
