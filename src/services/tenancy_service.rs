// src/services/tenancy_service.rs

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ObservationRepository, TenantRepository, UserRepository},
    models::{
        auth::{Role, RoleSet, SignupPayload, User},
        tenancy::{CreateLocationPayload, Location, Subscription, TenantContext, TenantOverview},
    },
    services::auth::{hash_password, AuthService},
};

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    observation_repo: ObservationRepository,
    auth_service: AuthService,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        observation_repo: ObservationRepository,
        auth_service: AuthService,
        pool: PgPool,
    ) -> Self {
        Self { tenant_repo, user_repo, observation_repo, auth_service, pool }
    }

    /// Cadastro: organização + assinatura no plano de menor nível + gerente,
    /// tudo ou nada. Devolve o token do novo gerente.
    pub async fn signup(&self, payload: SignupPayload) -> Result<String, AppError> {
        // Hashing fora da transação, não toca no banco
        let password_hash = hash_password(&payload.password).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let organization = self
            .tenant_repo
            .create_organization(&mut *tx, payload.organization_name.trim(), &payload.domain)
            .await?;

        let plan = self.tenant_repo.lowest_tier_plan(&mut *tx).await?;
        self.tenant_repo
            .insert_subscription(&mut *tx, &Subscription::for_new_organization(organization.id, &plan, now))
            .await?;

        let manager = User::new(
            &payload.email,
            &payload.full_name,
            password_hash,
            Some(organization.id),
            RoleSet::of(&[Role::Manager]),
            now,
        );
        let manager = self.user_repo.insert(&mut *tx, &manager).await?;

        tx.commit().await?;

        tracing::info!(
            organization_id = %organization.id,
            plan = %plan.name,
            "🏢 Organização '{}' criada",
            organization.name
        );

        self.auth_service.create_token(manager.id)
    }

    /// Organização do usuário, com assinatura e plano. `None` = sem vínculo.
    pub async fn resolve_tenant(&self, user: &User) -> Result<Option<TenantContext>, AppError> {
        let Some(organization_id) = user.organization_id else {
            return Ok(None);
        };
        let Some(organization) = self.tenant_repo.find_organization(organization_id).await? else {
            return Ok(None);
        };

        let subscription = self.tenant_repo.subscription_of(organization_id).await?;
        let plan = match &subscription {
            Some(sub) => self.tenant_repo.find_plan(&self.pool, sub.plan_id).await?,
            None => None,
        };

        Ok(Some(TenantContext { organization, subscription, plan }))
    }

    pub async fn overview(&self, tenant: TenantContext) -> Result<TenantOverview, AppError> {
        let user_count = self
            .user_repo
            .count_in_organization(&self.pool, tenant.organization_id())
            .await?;
        let observation_count = self
            .observation_repo
            .count_active(&self.pool, tenant.organization_id())
            .await?;

        Ok(TenantOverview {
            organization: tenant.organization,
            subscription: tenant.subscription,
            plan: tenant.plan,
            user_count,
            observation_count,
        })
    }

    pub async fn list_members(&self, organization_id: Uuid) -> Result<Vec<User>, AppError> {
        self.user_repo.list_by_organization(organization_id).await
    }

    // =========================================================================
    //  LOCAIS
    // =========================================================================

    pub async fn create_location(
        &self,
        actor: &User,
        organization_id: Uuid,
        payload: CreateLocationPayload,
    ) -> Result<Location, AppError> {
        ensure_manager(actor, "manage locations")?;

        let location = self
            .tenant_repo
            .create_location(
                &self.pool,
                organization_id,
                payload.name.trim(),
                payload.area.trim(),
                payload.facility.trim(),
            )
            .await?;

        tracing::info!(location_id = %location.id, "Local '{}' criado", location.name);
        Ok(location)
    }

    pub async fn list_locations(&self, organization_id: Uuid) -> Result<Vec<Location>, AppError> {
        self.tenant_repo.list_locations(organization_id).await
    }

    pub async fn delete_location(&self, actor: &User, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        ensure_manager(actor, "manage locations")?;
        self.tenant_repo.delete_location(organization_id, id).await
    }
}

/// Ações administrativas do tenant.
pub(crate) fn ensure_manager(actor: &User, action: &str) -> Result<(), AppError> {
    if actor.is_contractor() || !actor.is_manager() {
        return Err(AppError::Authorization(format!("Only managers can {}.", action)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::fixtures::user;

    #[test]
    fn only_non_contractor_managers_pass_the_manager_check() {
        assert!(ensure_manager(&user(&[Role::Manager], None), "x").is_ok());
        assert!(ensure_manager(&user(&[Role::SafetyManager], None), "x").is_err());
        assert!(ensure_manager(&user(&[Role::Manager, Role::Contractor], None), "x").is_err());
    }
}
