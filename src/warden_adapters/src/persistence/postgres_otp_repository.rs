use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use warden_core::{Error, IdentityId, OtpCode, OtpRepository, Result, SaltedHash};

use super::{OTP_NOT_FOUND, PgUnitOfWork, storage_fault::storage_error};

pub struct PostgresOtpRepository {
    pool: PgPool,
}

impl PostgresOtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OtpRow {
    identity_id: Uuid,
    code_hash: Vec<u8>,
    salt: Vec<u8>,
    expires_at: DateTime<Utc>,
}

impl From<OtpRow> for OtpCode {
    fn from(row: OtpRow) -> Self {
        OtpCode::new(
            IdentityId::from(row.identity_id),
            SaltedHash::new(row.code_hash, row.salt),
            row.expires_at,
        )
    }
}

#[async_trait]
impl OtpRepository for PostgresOtpRepository {
    type Tx = PgUnitOfWork;

    #[tracing::instrument(name = "Retrieving verification code from PostgreSQL", skip(self))]
    async fn get_by_identity_id(&self, identity_id: IdentityId) -> Result<OtpCode> {
        let row: Option<OtpRow> = sqlx::query_as(
            r#"
                SELECT identity_id, code_hash, salt, expires_at
                FROM otp_codes
                WHERE identity_id = $1
            "#,
        )
        .bind(Uuid::from(identity_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(OtpCode::from)
            .ok_or_else(|| Error::not_found(OTP_NOT_FOUND))
    }

    #[tracing::instrument(name = "Storing verification code in PostgreSQL", skip_all)]
    async fn upsert(&self, otp: &OtpCode) -> Result<()> {
        sqlx::query(
            r#"
                INSERT INTO otp_codes (identity_id, code_hash, salt, expires_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (identity_id) DO UPDATE
                SET code_hash = EXCLUDED.code_hash,
                    salt = EXCLUDED.salt,
                    expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(Uuid::from(otp.identity_id()))
        .bind(&otp.code().hash)
        .bind(&otp.code().salt)
        .bind(otp.expires_at())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    #[tracing::instrument(name = "Deleting verification code from PostgreSQL", skip(self, tx))]
    async fn delete(&self, tx: &mut PgUnitOfWork, identity_id: IdentityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM otp_codes WHERE identity_id = $1")
            .bind(Uuid::from(identity_id))
            .execute(tx.connection())
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(OTP_NOT_FOUND));
        }

        Ok(())
    }

    #[tracing::instrument(name = "Consuming verification code in PostgreSQL", skip_all)]
    async fn consume(&self, tx: &mut PgUnitOfWork, otp: &OtpCode) -> Result<()> {
        let result = sqlx::query(
            r#"
                DELETE FROM otp_codes
                WHERE identity_id = $1 AND code_hash = $2 AND salt = $3
            "#,
        )
        .bind(Uuid::from(otp.identity_id()))
        .bind(&otp.code().hash)
        .bind(&otp.code().salt)
        .execute(tx.connection())
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(OTP_NOT_FOUND));
        }

        Ok(())
    }
}
