// src/models/auth.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// Papéis (capacidades). Não são exclusivos: um usuário pode ser
// gerente E gestor de segurança ao mesmo tempo.
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    Observer,
    ActionOwner,
    SafetyManager,
    Contractor,
    Superuser,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Manager,
        Role::Observer,
        Role::ActionOwner,
        Role::SafetyManager,
        Role::Contractor,
        Role::Superuser,
    ];

    const fn bit(self) -> u8 {
        match self {
            Role::Manager => 1 << 0,
            Role::Observer => 1 << 1,
            Role::ActionOwner => 1 << 2,
            Role::SafetyManager => 1 << 3,
            Role::Contractor => 1 << 4,
            Role::Superuser => 1 << 5,
        }
    }
}

/// Conjunto de capacidades de um usuário.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        Self(bits)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Verdadeiro se o usuário tem pelo menos um dos papéis de `other`.
    pub fn intersects(&self, other: RoleSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn remove(&mut self, role: Role) {
        self.0 &= !role.bit();
    }

    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.contains(*r))
    }
}

impl Serialize for RoleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub organization_id: Option<Uuid>,

    #[schema(value_type = Vec<Role>)]
    pub roles: RoleSet,

    pub contractor_company: String,
    pub contractor_phone: String,
    pub contractor_access_expiry: Option<NaiveDate>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// As flags booleanas do banco viram um RoleSet
impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let flags = [
            ("is_manager", Role::Manager),
            ("is_observer", Role::Observer),
            ("is_action_owner", Role::ActionOwner),
            ("is_safety_manager", Role::SafetyManager),
            ("is_contractor", Role::Contractor),
            ("is_superuser", Role::Superuser),
        ];

        let mut roles = RoleSet::empty();
        for (column, role) in flags {
            if row.try_get::<bool, _>(column)? {
                roles.insert(role);
            }
        }

        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            full_name: row.try_get("full_name")?,
            password_hash: row.try_get("password_hash")?,
            organization_id: row.try_get("organization_id")?,
            roles,
            contractor_company: row.try_get("contractor_company")?,
            contractor_phone: row.try_get("contractor_phone")?,
            contractor_access_expiry: row.try_get("contractor_access_expiry")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl User {
    /// Usuário novo, ativo, sem dados de terceirizado.
    pub fn new(
        email: &str,
        full_name: &str,
        password_hash: String,
        organization_id: Option<Uuid>,
        roles: RoleSet,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            full_name: full_name.trim().to_string(),
            password_hash,
            organization_id,
            roles,
            contractor_company: String::new(),
            contractor_phone: String::new(),
            contractor_access_expiry: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any(&self, roles: RoleSet) -> bool {
        self.roles.intersects(roles)
    }

    pub fn is_manager(&self) -> bool {
        self.has(Role::Manager)
    }

    pub fn is_contractor(&self) -> bool {
        self.has(Role::Contractor)
    }

    /// Terceirizado cuja data de acesso já passou (o dia da expiração ainda vale).
    pub fn is_contractor_expired(&self, today: NaiveDate) -> bool {
        match self.contractor_access_expiry {
            Some(expiry) if self.is_contractor() => today > expiry,
            _ => false,
        }
    }

    pub fn has_observation_access(&self) -> bool {
        !self.is_contractor()
    }

    /// Aprovar, ativar e encerrar licenças sem ser o solicitante.
    pub fn has_permit_full_access(&self) -> bool {
        !self.is_contractor() && self.has_any(RoleSet::of(&[Role::Manager, Role::SafetyManager]))
    }

    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }
}

// Dados para cadastro de uma nova organização (e seu primeiro gerente)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupPayload {
    #[validate(length(min = 1, message = "The organization name is required."))]
    pub organization_name: String,
    #[validate(length(min = 2, max = 255, message = "The domain must have between 2 and 255 characters."))]
    pub domain: String,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub full_name: String,
    #[validate(email(message = "The email is invalid."))]
    pub email: String,
    #[validate(length(min = 8, message = "The password must have at least 8 characters."))]
    pub password: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "The email is invalid."))]
    pub email: String,
    #[validate(length(min = 1, message = "The password is required."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(roles: &[Role], organization_id: Option<Uuid>) -> User {
        User::new(
            &format!("{}@acme.test", Uuid::new_v4().simple()),
            "",
            String::new(),
            organization_id,
            RoleSet::of(roles),
            Utc::now(),
        )
    }
}
