// src/db/invite_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::invite::UserInvite};

#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, invite: &UserInvite) -> Result<UserInvite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, UserInvite>(
            r#"
            INSERT INTO user_invites (id, organization_id, email, role, token, is_used, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(invite.id)
        .bind(invite.organization_id)
        .bind(&invite.email)
        .bind(invite.role)
        .bind(invite.token)
        .bind(invite.is_used)
        .bind(invite.created_at)
        .bind(invite.expires_at)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    /// Trava a linha: duas aceitações simultâneas não consomem o mesmo convite.
    pub async fn find_by_token_for_update<'e, E>(
        &self,
        executor: E,
        token: Uuid,
    ) -> Result<Option<UserInvite>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, UserInvite>(
            "SELECT * FROM user_invites WHERE token = $1 FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(executor)
        .await?;
        Ok(invite)
    }

    pub async fn mark_used<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE user_invites SET is_used = TRUE WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Convites pendentes (não usados e não vencidos) do tenant.
    pub async fn list_pending(
        &self,
        organization_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserInvite>, AppError> {
        let invites = sqlx::query_as::<_, UserInvite>(
            r#"
            SELECT * FROM user_invites
            WHERE organization_id = $1
              AND NOT is_used
              AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }
}
