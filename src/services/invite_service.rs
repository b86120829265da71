// src/services/invite_service.rs

use std::sync::Arc;

use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InviteRepository, UserRepository},
    models::{
        auth::{Role, RoleSet, User},
        invite::{
            AcceptInvitePayload, ContractorIssued, InviteContractorPayload, InviteIssued,
            InviteUserPayload, UserInvite,
        },
        tenancy::TenantContext,
    },
    notify::{Notification, Notifier},
    services::{
        auth::{hash_password, AuthService},
        tenancy_service::ensure_manager,
    },
};

/// Tamanho da senha temporária de terceirizados.
pub const TEMPORARY_PASSWORD_LEN: usize = 12;

pub fn temporary_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[derive(Clone)]
pub struct InviteService {
    invite_repo: InviteRepository,
    user_repo: UserRepository,
    auth_service: AuthService,
    notifier: Arc<dyn Notifier>,
    site_url: String,
    pool: PgPool,
}

impl InviteService {
    pub fn new(
        invite_repo: InviteRepository,
        user_repo: UserRepository,
        auth_service: AuthService,
        notifier: Arc<dyn Notifier>,
        site_url: String,
        pool: PgPool,
    ) -> Self {
        Self { invite_repo, user_repo, auth_service, notifier, site_url, pool }
    }

    /// Convite por e-mail (somente gerente, respeitando a cota de usuários).
    pub async fn issue(
        &self,
        actor: &User,
        tenant: &TenantContext,
        payload: InviteUserPayload,
    ) -> Result<InviteIssued, AppError> {
        ensure_manager(actor, "invite users")?;

        let mut tx = self.pool.begin().await?;

        if let Some(plan) = &tenant.plan {
            let members = self
                .user_repo
                .count_in_organization(&mut *tx, tenant.organization_id())
                .await?;
            if plan.user_quota_reached(members) {
                return Err(AppError::CapacityExceeded(format!(
                    "Your {} plan allows up to {} users. Upgrade to invite more.",
                    plan.name,
                    plan.max_users.unwrap_or_default()
                )));
            }
        }

        let invite = UserInvite::issue(tenant.organization_id(), &payload.email, payload.role, Utc::now());
        let invite = self.invite_repo.insert(&mut *tx, &invite).await?;

        tx.commit().await?;

        tracing::info!(invite_id = %invite.id, role = ?invite.role, "✉️ Convite criado para {}", invite.email);

        // Depois do commit: falha no envio vira aviso
        let notification = Notification::Invite {
            organization_name: tenant.organization.name.clone(),
            role: invite.role.label().to_string(),
            accept_url: format!("{}/invites/{}/accept", self.site_url, invite.token),
            expires_at: invite.expires_at,
        };

        let mut warnings = Vec::new();
        if !self.notifier.send_notification(&invite.email, &notification).await {
            warnings.push(format!(
                "Invite created, but the email to {} could not be sent.",
                invite.email
            ));
        }

        Ok(InviteIssued { invite, warnings })
    }

    pub async fn list_pending(&self, actor: &User, organization_id: Uuid) -> Result<Vec<UserInvite>, AppError> {
        ensure_manager(actor, "view invitations")?;
        self.invite_repo.list_pending(organization_id, Utc::now()).await
    }

    /// Aceite (público). Cria ou atualiza o usuário do e-mail convidado e
    /// consome o convite na mesma transação. Devolve o token de sessão.
    pub async fn accept(&self, token: Uuid, payload: AcceptInvitePayload) -> Result<String, AppError> {
        let password_hash = hash_password(&payload.password).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let invite = self
            .invite_repo
            .find_by_token_for_update(&mut *tx, token)
            .await?
            .filter(|invite| invite.is_valid(now))
            .ok_or(AppError::InvalidInvite)?;

        let role = Role::from(invite.role);

        let user = match self.user_repo.find_by_email(&mut *tx, &invite.email).await? {
            Some(mut existing) => {
                existing.organization_id = Some(invite.organization_id);
                existing.password_hash = password_hash;
                if !payload.full_name.trim().is_empty() {
                    existing.full_name = payload.full_name.trim().to_string();
                }
                existing.roles.insert(role);
                existing.is_active = true;
                self.user_repo.save(&mut *tx, &existing).await?
            }
            None => {
                let user = User::new(
                    &invite.email,
                    &payload.full_name,
                    password_hash,
                    Some(invite.organization_id),
                    RoleSet::of(&[role]),
                    now,
                );
                self.user_repo.insert(&mut *tx, &user).await?
            }
        };

        self.invite_repo.mark_used(&mut *tx, invite.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, organization_id = %invite.organization_id, "Convite aceito");
        self.auth_service.create_token(user.id)
    }

    /// Terceirizado com senha temporária. Se o e-mail falhar, as credenciais
    /// voltam no aviso para serem repassadas manualmente.
    pub async fn invite_contractor(
        &self,
        actor: &User,
        tenant: &TenantContext,
        payload: InviteContractorPayload,
    ) -> Result<ContractorIssued, AppError> {
        ensure_manager(actor, "invite contractor users")?;

        let temp_password = temporary_password();
        let password_hash = hash_password(&temp_password).await?;

        let mut contractor = User::new(
            &payload.email,
            &payload.full_name,
            password_hash,
            Some(tenant.organization_id()),
            RoleSet::of(&[Role::Contractor]),
            Utc::now(),
        );
        contractor.contractor_company = payload.contractor_company.trim().to_string();
        contractor.contractor_phone = payload.contractor_phone.trim().to_string();
        contractor.contractor_access_expiry = payload.contractor_access_expiry;

        let contractor = self.user_repo.insert(&self.pool, &contractor).await?;

        tracing::info!(
            user_id = %contractor.id,
            company = %contractor.contractor_company,
            "👷 Terceirizado criado"
        );

        let notification = Notification::ContractorCredentials {
            organization_name: tenant.organization.name.clone(),
            full_name: contractor.full_name.clone(),
            email: contractor.email.clone(),
            temporary_password: temp_password.clone(),
            access_expiry: contractor.contractor_access_expiry,
            login_url: format!("{}/login", self.site_url),
        };

        let mut warnings = Vec::new();
        if !self.notifier.send_notification(&contractor.email, &notification).await {
            warnings.push(format!(
                "Contractor created but email failed to send. Please share credentials manually: {} / {}",
                contractor.email, temp_password
            ));
        }

        Ok(ContractorIssued { contractor, warnings })
    }

    pub async fn list_contractors(&self, actor: &User, organization_id: Uuid) -> Result<Vec<User>, AppError> {
        ensure_manager(actor, "view contractors")?;
        let members = self.user_repo.list_by_organization(organization_id).await?;
        Ok(members.into_iter().filter(User::is_contractor).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_password_is_alphanumeric() {
        let password = temporary_password();
        assert_eq!(password.len(), TEMPORARY_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, temporary_password());
    }
}
