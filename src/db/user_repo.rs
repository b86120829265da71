// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::auth::{Role, User},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail (sempre em minúsculas)
    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Usuário do tenant (outro tenant = não encontrado).
    pub async fn find_in_organization(&self, organization_id: Uuid, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list_by_organization(&self, organization_id: Uuid) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE organization_id = $1 AND is_active ORDER BY full_name, email",
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Conta para a cota de usuários do plano.
    pub async fn count_in_organization<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE organization_id = $1 AND is_active",
        )
        .bind(organization_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    // Cria um novo usuário; e-mail duplicado vira erro de domínio
    pub async fn insert<'e, E>(&self, executor: E, user: &User) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, full_name, password_hash, organization_id,
                is_manager, is_observer, is_action_owner, is_safety_manager, is_contractor, is_superuser,
                contractor_company, contractor_phone, contractor_access_expiry, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(user.email.trim().to_lowercase())
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.organization_id)
        .bind(user.has(Role::Manager))
        .bind(user.has(Role::Observer))
        .bind(user.has(Role::ActionOwner))
        .bind(user.has(Role::SafetyManager))
        .bind(user.has(Role::Contractor))
        .bind(user.has(Role::Superuser))
        .bind(&user.contractor_company)
        .bind(&user.contractor_phone)
        .bind(user.contractor_access_expiry)
        .bind(user.is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, AppError::EmailAlreadyExists))
    }

    /// Grava o estado atual (papéis, organização, senha, dados de terceirizado).
    pub async fn save<'e, E>(&self, executor: E, user: &User) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = $2, password_hash = $3, organization_id = $4,
                is_manager = $5, is_observer = $6, is_action_owner = $7,
                is_safety_manager = $8, is_contractor = $9, is_superuser = $10,
                contractor_company = $11, contractor_phone = $12, contractor_access_expiry = $13,
                is_active = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.organization_id)
        .bind(user.has(Role::Manager))
        .bind(user.has(Role::Observer))
        .bind(user.has(Role::ActionOwner))
        .bind(user.has(Role::SafetyManager))
        .bind(user.has(Role::Contractor))
        .bind(user.has(Role::Superuser))
        .bind(&user.contractor_company)
        .bind(&user.contractor_phone)
        .bind(user.contractor_access_expiry)
        .bind(user.is_active)
        .fetch_optional(executor)
        .await?;

        saved.ok_or(AppError::UserNotFound)
    }
}
