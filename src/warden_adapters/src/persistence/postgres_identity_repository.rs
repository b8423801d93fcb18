use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use warden_core::{
    Error, Identity, IdentityId, IdentityRepository, Result, SaltedHash, Username,
};

use super::{IDENTITY_NOT_FOUND, PgUnitOfWork, storage_fault::storage_error};

pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    username: String,
    password_hash: Vec<u8>,
    password_salt: Vec<u8>,
    email_hash: Vec<u8>,
    email_salt: Vec<u8>,
    email_verified: bool,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = Error;

    fn try_from(row: IdentityRow) -> Result<Self> {
        let username = Username::try_from(row.username)
            .map_err(|e| Error::unexpected("decode identity row", e))?;

        Ok(Identity::from_parts(
            IdentityId::from(row.id),
            username,
            SaltedHash::new(row.password_hash, row.password_salt),
            SaltedHash::new(row.email_hash, row.email_salt),
            row.email_verified,
        ))
    }
}

const SELECT_IDENTITY: &str = r#"
    SELECT id, username, password_hash, password_salt, email_hash, email_salt, email_verified
    FROM identities
"#;

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    type Tx = PgUnitOfWork;

    #[tracing::instrument(name = "Retrieving identity from PostgreSQL", skip(self))]
    async fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!("{SELECT_IDENTITY} WHERE id = $1"))
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.ok_or_else(|| Error::not_found(IDENTITY_NOT_FOUND))?
            .try_into()
    }

    #[tracing::instrument(name = "Retrieving identity by username from PostgreSQL", skip_all)]
    async fn get_by_username(&self, username: &Username) -> Result<Identity> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("{SELECT_IDENTITY} WHERE username = $1"))
                .bind(username.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        row.ok_or_else(|| Error::not_found(IDENTITY_NOT_FOUND))?
            .try_into()
    }

    #[tracing::instrument(name = "Adding identity to PostgreSQL", skip_all)]
    async fn create(&self, tx: &mut PgUnitOfWork, identity: &Identity) -> Result<()> {
        sqlx::query(
            r#"
                INSERT INTO identities
                    (id, username, password_hash, password_salt, email_hash, email_salt, email_verified)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::from(identity.id()))
        .bind(identity.username().as_str())
        .bind(&identity.password().hash)
        .bind(&identity.password().salt)
        .bind(&identity.email().hash)
        .bind(&identity.email().salt)
        .bind(identity.email_verified())
        .execute(tx.connection())
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    #[tracing::instrument(name = "Marking identity email verified", skip(self, tx))]
    async fn email_verified(&self, tx: &mut PgUnitOfWork, id: IdentityId) -> Result<()> {
        let result = sqlx::query("UPDATE identities SET email_verified = TRUE WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(tx.connection())
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(IDENTITY_NOT_FOUND));
        }

        Ok(())
    }

    #[tracing::instrument(name = "Deleting identity from PostgreSQL", skip(self, tx))]
    async fn delete_by_id(&self, tx: &mut PgUnitOfWork, id: IdentityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(tx.connection())
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found(IDENTITY_NOT_FOUND));
        }

        Ok(())
    }
}
