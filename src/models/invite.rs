// src/models/invite.rs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Role;

/// Prazo padrão de um convite.
pub const INVITE_TTL_DAYS: i64 = 7;

// Papel único do convite (diferente das flags do usuário)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invite_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InviteRole {
    Observer,
    ActionOwner,
    Manager,
}

impl InviteRole {
    pub fn label(&self) -> &'static str {
        match self {
            InviteRole::Observer => "Observer",
            InviteRole::ActionOwner => "Action Owner",
            InviteRole::Manager => "Manager",
        }
    }
}

impl From<InviteRole> for Role {
    fn from(role: InviteRole) -> Self {
        match role {
            InviteRole::Observer => Role::Observer,
            InviteRole::ActionOwner => Role::ActionOwner,
            InviteRole::Manager => Role::Manager,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInvite {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub email: String,
    pub role: InviteRole,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub token: Uuid,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserInvite {
    pub fn issue(organization_id: Uuid, email: &str, role: InviteRole, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            email: email.trim().to_lowercase(),
            role,
            token: Uuid::new_v4(),
            is_used: false,
            created_at: now,
            expires_at: Some(now + Duration::days(INVITE_TTL_DAYS)),
        }
    }

    /// Válido = não usado E (sem expiração OU expiração no futuro).
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserPayload {
    #[validate(email(message = "The email is invalid."))]
    pub email: String,
    pub role: InviteRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitePayload {
    #[validate(length(max = 255))]
    #[serde(default)]
    pub full_name: String,
    #[validate(length(min = 8, message = "The password must have at least 8 characters."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteContractorPayload {
    #[validate(email(message = "The email is invalid."))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "The contractor name is required."))]
    pub full_name: String,
    #[validate(length(min = 1, max = 255, message = "The contractor company is required."))]
    pub contractor_company: String,
    #[validate(length(max = 50))]
    #[serde(default)]
    pub contractor_phone: String,
    pub contractor_access_expiry: Option<NaiveDate>,
}

// Resposta do convite: o link vai por e-mail, falhas viram aviso
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InviteIssued {
    pub invite: UserInvite,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContractorIssued {
    pub contractor: crate::models::auth::User,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_invite_is_valid_for_seven_days() {
        let now = Utc::now();
        let invite = UserInvite::issue(Uuid::new_v4(), " Bob@Acme.com ", InviteRole::Observer, now);
        assert_eq!(invite.email, "bob@acme.com");
        assert!(invite.is_valid(now));
        assert!(invite.is_valid(now + Duration::days(6)));
        assert!(!invite.is_valid(now + Duration::days(8)));
    }

    #[test]
    fn used_invite_is_never_valid() {
        let now = Utc::now();
        let mut invite = UserInvite::issue(Uuid::new_v4(), "bob@acme.com", InviteRole::Manager, now);
        invite.expires_at = None;
        invite.is_used = true;
        assert!(!invite.is_valid(now));
    }
}
