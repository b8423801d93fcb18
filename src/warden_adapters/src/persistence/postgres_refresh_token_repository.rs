use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use warden_core::{Clock, Error, IdentityId, RefreshToken, RefreshTokenRepository, Result};

use super::{PgUnitOfWork, REFRESH_TOKEN_NOT_FOUND, storage_fault::storage_error};

/// Refresh tokens past their expiration date read as absent.
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    token: Vec<u8>,
    identity_id: Uuid,
    expiration_date: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken::new(
            row.token,
            IdentityId::from(row.identity_id),
            row.expiration_date,
        )
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    type Tx = PgUnitOfWork;

    #[tracing::instrument(name = "Retrieving refresh token from PostgreSQL", skip_all)]
    async fn get_by_token(&self, token: &[u8]) -> Result<RefreshToken> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            r#"
                SELECT token, identity_id, expiration_date
                FROM refresh_tokens
                WHERE token = $1 AND expiration_date > $2
            "#,
        )
        .bind(token)
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(RefreshToken::from)
            .ok_or_else(|| Error::not_found(REFRESH_TOKEN_NOT_FOUND))
    }

    #[tracing::instrument(name = "Retrieving active refresh token from PostgreSQL", skip(self))]
    async fn get_active_for_identity(&self, identity_id: IdentityId) -> Result<RefreshToken> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            r#"
                SELECT token, identity_id, expiration_date
                FROM refresh_tokens
                WHERE identity_id = $1 AND expiration_date > $2
                ORDER BY expiration_date DESC
                LIMIT 1
            "#,
        )
        .bind(Uuid::from(identity_id))
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(RefreshToken::from)
            .ok_or_else(|| Error::not_found(REFRESH_TOKEN_NOT_FOUND))
    }

    #[tracing::instrument(name = "Adding refresh token to PostgreSQL", skip_all)]
    async fn create(&self, tx: &mut PgUnitOfWork, token: &RefreshToken) -> Result<()> {
        sqlx::query(
            r#"
                INSERT INTO refresh_tokens (token, identity_id, expiration_date)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(token.token())
        .bind(Uuid::from(token.identity_id()))
        .bind(token.expiration_date())
        .execute(tx.connection())
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    #[tracing::instrument(name = "Deleting refresh token from PostgreSQL", skip_all)]
    async fn delete(&self, token: &[u8]) -> Result<()> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(REFRESH_TOKEN_NOT_FOUND));
        }

        Ok(())
    }
}
