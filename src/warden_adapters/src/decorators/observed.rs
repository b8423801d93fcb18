use std::{future::Future, time::Instant};

use async_trait::async_trait;
use tracing::Instrument;
use warden_core::{
    Identity, IdentityId, IdentityRepository, IsolationLevel, OtpCode, OtpRepository,
    RefreshToken, RefreshTokenRepository, Result, TransactionManager, Username,
};

pub const CALLS_TOTAL: &str = "warden_repository_calls_total";
pub const CALL_DURATION_SECONDS: &str = "warden_repository_call_duration_seconds";

/// One span, one counter increment and one latency sample per call.
pub struct Observed<R> {
    entity: &'static str,
    inner: R,
}

impl<R> Observed<R> {
    pub fn new(entity: &'static str, inner: R) -> Self {
        Self { entity, inner }
    }

    async fn observe<T, F>(&self, verb: &'static str, method: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let span = tracing::info_span!(
            "repository",
            entity = self.entity,
            verb,
            method,
            outcome = tracing::field::Empty
        );
        let mut guard = CallGuard::start(self.entity, verb, method, span.clone());

        let result = call.instrument(span).await;
        guard.outcome = outcome(&result);

        result
    }
}

fn outcome<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(_) => "error",
    }
}

/// Records the outcome on the span and in metrics when dropped, so a call
/// whose future is dropped mid-flight still counts, as `cancelled`.
struct CallGuard {
    entity: &'static str,
    verb: &'static str,
    method: &'static str,
    span: tracing::Span,
    started: Instant,
    outcome: &'static str,
}

impl CallGuard {
    fn start(
        entity: &'static str,
        verb: &'static str,
        method: &'static str,
        span: tracing::Span,
    ) -> Self {
        Self {
            entity,
            verb,
            method,
            span,
            started: Instant::now(),
            outcome: "cancelled",
        }
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.span.record("outcome", self.outcome);
        metrics::counter!(
            CALLS_TOTAL,
            "entity" => self.entity,
            "verb" => self.verb,
            "method" => self.method,
            "outcome" => self.outcome
        )
        .increment(1);
        metrics::histogram!(
            CALL_DURATION_SECONDS,
            "entity" => self.entity,
            "verb" => self.verb,
            "method" => self.method,
            "outcome" => self.outcome
        )
        .record(self.started.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl<R: IdentityRepository> IdentityRepository for Observed<R> {
    type Tx = R::Tx;

    async fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        self.observe("read", "get_by_id", self.inner.get_by_id(id))
            .await
    }

    async fn get_by_username(&self, username: &Username) -> Result<Identity> {
        self.observe("read", "get_by_username", self.inner.get_by_username(username))
            .await
    }

    async fn create(&self, tx: &mut R::Tx, identity: &Identity) -> Result<()> {
        self.observe("write", "create", self.inner.create(tx, identity))
            .await
    }

    async fn email_verified(&self, tx: &mut R::Tx, id: IdentityId) -> Result<()> {
        self.observe("write", "email_verified", self.inner.email_verified(tx, id))
            .await
    }

    async fn delete_by_id(&self, tx: &mut R::Tx, id: IdentityId) -> Result<()> {
        self.observe("delete", "delete_by_id", self.inner.delete_by_id(tx, id))
            .await
    }

    async fn forget(&self, id: IdentityId) {
        self.inner.forget(id).await
    }
}

#[async_trait]
impl<R: OtpRepository> OtpRepository for Observed<R> {
    type Tx = R::Tx;

    async fn get_by_identity_id(&self, identity_id: IdentityId) -> Result<OtpCode> {
        self.observe(
            "read",
            "get_by_identity_id",
            self.inner.get_by_identity_id(identity_id),
        )
        .await
    }

    async fn upsert(&self, otp: &OtpCode) -> Result<()> {
        self.observe("write", "upsert", self.inner.upsert(otp)).await
    }

    async fn delete(&self, tx: &mut R::Tx, identity_id: IdentityId) -> Result<()> {
        self.observe("delete", "delete", self.inner.delete(tx, identity_id))
            .await
    }

    async fn consume(&self, tx: &mut R::Tx, otp: &OtpCode) -> Result<()> {
        self.observe("delete", "consume", self.inner.consume(tx, otp))
            .await
    }
}

#[async_trait]
impl<R: RefreshTokenRepository> RefreshTokenRepository for Observed<R> {
    type Tx = R::Tx;

    async fn get_by_token(&self, token: &[u8]) -> Result<RefreshToken> {
        self.observe("read", "get_by_token", self.inner.get_by_token(token))
            .await
    }

    async fn get_active_for_identity(&self, identity_id: IdentityId) -> Result<RefreshToken> {
        self.observe(
            "read",
            "get_active_for_identity",
            self.inner.get_active_for_identity(identity_id),
        )
        .await
    }

    async fn create(&self, tx: &mut R::Tx, token: &RefreshToken) -> Result<()> {
        self.observe("write", "create", self.inner.create(tx, token))
            .await
    }

    async fn delete(&self, token: &[u8]) -> Result<()> {
        self.observe("delete", "delete", self.inner.delete(token))
            .await
    }
}

#[async_trait]
impl<R: TransactionManager> TransactionManager for Observed<R> {
    type Tx = R::Tx;

    async fn begin(&self, isolation: IsolationLevel) -> Result<R::Tx> {
        self.observe("transaction", "begin", self.inner.begin(isolation))
            .await
    }

    async fn commit(&self, tx: R::Tx) -> Result<()> {
        self.observe("transaction", "commit", self.inner.commit(tx))
            .await
    }
}
