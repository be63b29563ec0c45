//! Request scope: identity, transaction propagation and cancellation.
//!
//! [`RequestScope`] is the Rust rendition of a propagating request context.
//! It is immutable and cheap to clone; "writing" to it produces a child
//! scope. A scope carries at most one [`TenantIdentity`] (attached by the
//! authenticator, read by the repository) and, while a
//! [`Repository::execute`](crate::Repository::execute) block is running, a
//! [`TxHandle`] so that nested repository calls share the transaction.

use std::future::Future;
use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, Statement};
use tenkit_errors::Error;
use tenkit_security::TenantIdentity;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Opaque handle to an open database transaction.
///
/// Created only by [`Repository::execute`](crate::Repository::execute);
/// every repository call that observes the owning scope runs on this handle
/// instead of the base connection. One request task drives the handle at a
/// time; the scope convention serializes access.
#[derive(Clone)]
pub struct TxHandle {
    inner: Arc<DatabaseTransaction>,
}

impl TxHandle {
    pub(crate) fn new(tx: DatabaseTransaction) -> Self {
        Self {
            inner: Arc::new(tx),
        }
    }

    pub(crate) fn transaction(&self) -> &DatabaseTransaction {
        &self.inner
    }

    /// Reclaim the transaction for commit/rollback. Fails when a clone of
    /// the owning scope escaped the `execute` block.
    pub(crate) fn try_into_inner(self) -> Option<DatabaseTransaction> {
        Arc::try_unwrap(self.inner).ok()
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxHandle").finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct ScopeInner {
    identity: Option<TenantIdentity>,
    tx: Option<TxHandle>,
    cancel: CancellationToken,
}

/// Immutable, propagating per-request context.
///
/// Cloning is cheap; children share the parent's cancellation token unless
/// explicitly [`detached`](Self::detached).
#[derive(Clone, Debug, Default)]
pub struct RequestScope {
    inner: Arc<ScopeInner>,
}

impl RequestScope {
    /// A fresh scope with no identity and no transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Child scope carrying the given identity.
    ///
    /// The authenticator attaches the identity exactly once per request;
    /// the repository only ever reads it.
    #[must_use]
    pub fn with_identity(&self, identity: TenantIdentity) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                identity: Some(identity),
                tx: self.inner.tx.clone(),
                cancel: self.inner.cancel.clone(),
            }),
        }
    }

    /// The identity attached to this scope, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&TenantIdentity> {
        self.inner.identity.as_ref()
    }

    /// Child scope observing an open transaction.
    pub(crate) fn with_tx(&self, tx: TxHandle) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                identity: self.inner.identity.clone(),
                tx: Some(tx),
                cancel: self.inner.cancel.clone(),
            }),
        }
    }

    pub(crate) fn tx(&self) -> Option<&TxHandle> {
        self.inner.tx.as_ref()
    }

    /// Whether this scope observes an open transaction.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.inner.tx.is_some()
    }

    /// Resolve the execution handle: the scoped transaction when present,
    /// the base connection otherwise.
    pub(crate) fn resolve<'a>(&'a self, base: &'a DatabaseConnection) -> ExecConn<'a> {
        match self.tx() {
            Some(handle) => ExecConn::Tx(handle.transaction()),
            None => ExecConn::Base(base),
        }
    }

    /// Cooperatively cancel this scope (and every scope sharing its token).
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Child scope with a fresh cancellation token, detached from the
    /// parent's. Opt-in only: long-running work that must outlive the
    /// request says so explicitly.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                identity: self.inner.identity.clone(),
                tx: self.inner.tx.clone(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Run `fut` unless the scope is cancelled first. An in-flight
    /// operation aborts with `Canceled`; atomicity remains the
    /// transaction's responsibility.
    pub(crate) async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => {
                Err(Error::canceled("request scope cancelled"))
            }
            out = fut => out,
        }
    }
}

/// Execution handle resolved from a scope: either the base connection or
/// the scoped transaction. Implements `ConnectionTrait` by delegation so
/// every repository operation is written once against it.
pub(crate) enum ExecConn<'a> {
    Base(&'a DatabaseConnection),
    Tx(&'a DatabaseTransaction),
}

#[async_trait::async_trait]
impl ConnectionTrait for ExecConn<'_> {
    fn get_database_backend(&self) -> DbBackend {
        match self {
            ExecConn::Base(conn) => conn.get_database_backend(),
            ExecConn::Tx(tx) => tx.get_database_backend(),
        }
    }

    async fn execute(
        &self,
        stmt: Statement,
    ) -> std::result::Result<sea_orm::ExecResult, sea_orm::DbErr> {
        match self {
            ExecConn::Base(conn) => conn.execute(stmt).await,
            ExecConn::Tx(tx) => tx.execute(stmt).await,
        }
    }

    async fn execute_unprepared(
        &self,
        sql: &str,
    ) -> std::result::Result<sea_orm::ExecResult, sea_orm::DbErr> {
        match self {
            ExecConn::Base(conn) => conn.execute_unprepared(sql).await,
            ExecConn::Tx(tx) => tx.execute_unprepared(sql).await,
        }
    }

    async fn query_one(
        &self,
        stmt: Statement,
    ) -> std::result::Result<Option<sea_orm::QueryResult>, sea_orm::DbErr> {
        match self {
            ExecConn::Base(conn) => conn.query_one(stmt).await,
            ExecConn::Tx(tx) => tx.query_one(stmt).await,
        }
    }

    async fn query_all(
        &self,
        stmt: Statement,
    ) -> std::result::Result<Vec<sea_orm::QueryResult>, sea_orm::DbErr> {
        match self {
            ExecConn::Base(conn) => conn.query_all(stmt).await,
            ExecConn::Tx(tx) => tx.query_all(stmt).await,
        }
    }
}
