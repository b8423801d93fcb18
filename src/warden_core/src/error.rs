use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Uniform outcome of every repository and service boundary.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub const USERNAME_ALREADY_EXISTS: &str = "Username already exists";
pub const EMAIL_ALREADY_EXISTS: &str = "Email already exists";
pub const IDENTITY_DOES_NOT_EXIST: &str = "Identity does not exist";
pub const INVALID_CREDENTIALS: &str = "Username or password is incorrect";
pub const INVALID_VERIFICATION_CODE: &str = "Code does not match or expired";
pub const INVALID_REFRESH_TOKEN: &str = "Refresh token is not valid";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// The three error kinds callers are allowed to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Unexpected,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    /// Display is opaque. The context and the source chain are
    /// only visible through `Debug` and `source()`.
    #[error("An unexpected error occurred")]
    Unexpected {
        context: String,
        #[source]
        source: BoxError,
    },
    /// A concurrent transaction won a serialization race. The whole unit of
    /// work may be retried; callers that give up see an opaque error.
    #[error("An unexpected error occurred")]
    Conflict {
        context: String,
        #[source]
        source: BoxError,
    },
    /// Raw fault produced by a storage adapter. Only the resilience wrapper
    /// should ever see this variant.
    #[error("Unclassified storage fault: {0}")]
    Storage(#[from] StorageFault),
}

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unexpected(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unexpected {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn conflict(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Conflict {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Unexpected { .. } | Self::Conflict { .. } | Self::Storage(_) => {
                ErrorKind::Unexpected
            }
        }
    }

    /// Message that is safe to hand to an end user.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Unexpected => UNEXPECTED_ERROR.to_string(),
            _ => self.to_string(),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::BadRequest(a), Self::BadRequest(b)) => a == b,
            (Self::Unexpected { .. }, Self::Unexpected { .. }) => true,
            (Self::Conflict { .. }, Self::Conflict { .. }) => true,
            (Self::Storage(a), Self::Storage(b)) => a.kind == b.kind,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFaultKind {
    UniqueViolation,
    ForeignKeyViolation,
    /// Serializable or repeatable-read transaction lost to a concurrent one.
    SerializationFailure,
    Connectivity,
    Other,
}

/// A storage-technology fault, stripped down to what the resilience layer
/// needs to classify it. The original error is kept as the source.
#[derive(Debug, Error)]
#[error("{kind:?} (constraint: {constraint:?}): {source}")]
pub struct StorageFault {
    kind: StorageFaultKind,
    constraint: Option<String>,
    #[source]
    source: BoxError,
}

impl StorageFault {
    pub fn new(
        kind: StorageFaultKind,
        constraint: Option<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            kind,
            constraint,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> StorageFaultKind {
        self.kind
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }

    pub fn into_source(self) -> BoxError {
        self.source
    }
}
