use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use warden_core::{IsolationLevel, Result, TransactionManager, UnitOfWork};

use super::storage_fault::storage_error;

/// A PostgreSQL transaction owned by the operation that began it.
///
/// Dropping it without calling [`UnitOfWork::commit`] rolls it back.
pub struct PgUnitOfWork {
    transaction: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    pub(crate) fn connection(&mut self) -> &mut PgConnection {
        &mut self.transaction
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.transaction.commit().await.map_err(storage_error)
    }

    async fn rollback(self) -> Result<()> {
        self.transaction.rollback().await.map_err(storage_error)
    }
}

#[derive(Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    type Tx = PgUnitOfWork;

    #[tracing::instrument(name = "Beginning PostgreSQL transaction", skip(self))]
    async fn begin(&self, isolation: IsolationLevel) -> Result<PgUnitOfWork> {
        let mut transaction = self.pool.begin().await.map_err(storage_error)?;

        let statement = format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.as_sql());
        sqlx::query(&statement)
            .execute(&mut *transaction)
            .await
            .map_err(storage_error)?;

        Ok(PgUnitOfWork { transaction })
    }
}
