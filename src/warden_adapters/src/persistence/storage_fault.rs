use warden_core::{Error, StorageFault, StorageFaultKind};

/// SQLSTATE codes PostgreSQL reports when a transaction must be retried.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

fn is_retryable(code: Option<&str>) -> bool {
    matches!(code, Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED))
}

/// Reduce a driver error to the fault kinds the resilience layer classifies.
pub fn into_fault(error: sqlx::Error) -> StorageFault {
    let (kind, constraint) = match &error {
        sqlx::Error::Database(db_error) => {
            let kind = match db_error.kind() {
                _ if is_retryable(db_error.code().as_deref()) => {
                    StorageFaultKind::SerializationFailure
                }
                sqlx::error::ErrorKind::UniqueViolation => StorageFaultKind::UniqueViolation,
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    StorageFaultKind::ForeignKeyViolation
                }
                _ => StorageFaultKind::Other,
            };
            (kind, db_error.constraint().map(str::to_owned))
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => (StorageFaultKind::Connectivity, None),
        _ => (StorageFaultKind::Other, None),
    };

    StorageFault::new(kind, constraint, error)
}

pub(crate) fn storage_error(error: sqlx::Error) -> Error {
    Error::Storage(into_fault(error))
}
