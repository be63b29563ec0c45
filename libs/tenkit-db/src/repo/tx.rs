//! Transaction blocks and their propagation through the scope.

use std::future::Future;
use std::pin::Pin;

use futures::FutureExt;
use sea_orm::TransactionTrait;
use tenkit_errors::Error;

use super::{Repository, map_db_err};
use crate::Result;
use crate::policy::TenantPolicy;
use crate::scope::{RequestScope, TxHandle};

/// The boxed future a transaction closure returns.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

impl<E> Repository<E>
where
    E: TenantPolicy,
{
    /// Run `f` inside a database transaction.
    ///
    /// The closure receives a child scope observing the transaction; every
    /// repository call made through that scope — on any repository backed
    /// by the same handle — shares it. Commit happens when `f` returns
    /// `Ok`, rollback when it returns `Err` or panics (the panic is then
    /// resumed). A nested `execute` on a scope that already observes a
    /// transaction reuses it and leaves commit/rollback to the outermost
    /// block.
    ///
    /// ```rust,ignore
    /// let moved = repo.execute(&scope, |tx| Box::pin(async move {
    ///     let widget = repo.find_by_id(tx, id).await?;
    ///     repo.delete(tx, id).await?;
    ///     archive_repo.create(tx, widget.into()).await
    /// })).await?;
    /// ```
    ///
    /// # Errors
    /// Whatever `f` returns, or `Internal` when the transaction cannot be
    /// started or committed.
    pub async fn execute<T, F>(&self, scope: &RequestScope, f: F) -> Result<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a RequestScope) -> TxFuture<'a, T> + Send,
    {
        if scope.in_transaction() {
            return f(scope).await;
        }

        let txn = self.db().sea().begin().await.map_err(map_db_err)?;
        let handle = TxHandle::new(txn);
        let child = scope.with_tx(handle.clone());

        let outcome = std::panic::AssertUnwindSafe(child.guard(f(&child)))
            .catch_unwind()
            .await;
        drop(child);

        match outcome {
            Ok(Ok(value)) => {
                let txn = handle.try_into_inner().ok_or_else(handle_escaped)?;
                txn.commit().await.map_err(map_db_err)?;
                Ok(value)
            }
            Ok(Err(err)) => {
                match handle.try_into_inner() {
                    Some(txn) => {
                        let _ = txn.rollback().await;
                    }
                    None => {
                        tracing::warn!("transaction handle escaped its execute block; rolling back on drop");
                    }
                }
                Err(err)
            }
            Err(panic) => {
                if let Some(txn) = handle.try_into_inner() {
                    let _ = txn.rollback().await;
                }
                std::panic::resume_unwind(panic);
            }
        }
    }
}

// A clone of the child scope outlived the execute block, so the
// transaction cannot be reclaimed; it rolls back when the last clone is
// dropped.
fn handle_escaped() -> Error {
    Error::internal("transaction handle escaped its execute block")
}
