use async_trait::async_trait;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// An open transaction, owned by the call that began it.
///
/// Dropping a unit of work without committing rolls it back, so a cancelled
/// operation never leaves a partial commit behind.
#[async_trait]
pub trait UnitOfWork: Send + Sized + 'static {
    async fn commit(self) -> Result<()>;
    async fn rollback(self) -> Result<()>;
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self, isolation: IsolationLevel) -> Result<Self::Tx>;

    /// Commit a unit of work begun by this manager.
    ///
    /// Services commit through the manager rather than the unit of work so
    /// that commit-time faults pass through the same decorators as every
    /// other storage call.
    async fn commit(&self, tx: Self::Tx) -> Result<()> {
        tx.commit().await
    }
}
