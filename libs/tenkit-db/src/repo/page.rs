//! Pagination under a consistent snapshot.
//!
//! Total and slice are computed inside one REPEATABLE READ transaction so
//! they cannot disagree about concurrent writers. When the scope already
//! observes a transaction, that snapshot is reused instead.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ConnectionTrait, FromQueryResult, IsolationLevel, PaginatorTrait, QueryFilter, QuerySelect,
    Select, TransactionTrait, Value,
};

use super::{MAX_PAGE_SIZE, PageResult, Repository, map_db_err};
use crate::Result;
use crate::handle::DbEngine;
use crate::options::QueryOptions;
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;

impl<E> Repository<E>
where
    E: TenantPolicy,
    E::Model: FromQueryResult + Send + Sync,
{
    /// Fetch one page of visible rows plus consistent totals.
    ///
    /// `page` is clamped to ≥ 1 and `page_size` into `[1, MAX_PAGE_SIZE]`.
    ///
    /// # Errors
    /// Driver and transaction failures surface as `Internal`.
    pub async fn paginate(
        &self,
        scope: &RequestScope,
        page: u64,
        page_size: u64,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<PageResult<E::Model>> {
        self.paginate_with(scope, page, page_size, fragment, args, &QueryOptions::default())
            .await
    }

    /// [`paginate`](Self::paginate) with query options.
    ///
    /// # Errors
    /// `InvalidArgument` when an option fragment fails validation.
    pub async fn paginate_with(
        &self,
        scope: &RequestScope,
        page: u64,
        page_size: u64,
        fragment: &str,
        args: Vec<Value>,
        opts: &QueryOptions,
    ) -> Result<PageResult<E::Model>> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let mut query = self.scoped_select(scope)?;
        if !fragment.trim().is_empty() {
            query = query.filter(Expr::cust_with_values(fragment, args));
        }
        let query = opts.apply(query)?;

        scope
            .guard(async {
                match scope.tx() {
                    // Inside an execute block: the surrounding snapshot
                    // already guarantees consistency.
                    Some(handle) => {
                        page_on(handle.transaction(), query, page, page_size).await
                    }
                    None => {
                        // SQLite transactions are serializable already; the
                        // explicit level is for the server backends.
                        let txn = if matches!(self.db().engine(), DbEngine::Sqlite) {
                            self.db().sea().begin().await
                        } else {
                            self.db()
                                .sea()
                                .begin_with_config(Some(IsolationLevel::RepeatableRead), None)
                                .await
                        }
                        .map_err(map_db_err)?;
                        let out = page_on(&txn, query, page, page_size).await;
                        match out {
                            Ok(result) => {
                                txn.commit().await.map_err(map_db_err)?;
                                Ok(result)
                            }
                            Err(err) => {
                                let _ = txn.rollback().await;
                                Err(err)
                            }
                        }
                    }
                }
            })
            .await
    }
}

async fn page_on<E, C>(
    conn: &C,
    query: Select<E>,
    page: u64,
    page_size: u64,
) -> Result<PageResult<E::Model>>
where
    E: TenantPolicy,
    E::Model: FromQueryResult + Send + Sync,
    C: ConnectionTrait,
{
    let total = query.clone().count(conn).await.map_err(map_db_err)?;

    let items = query
        .offset((page - 1) * page_size)
        .limit(page_size)
        .all(conn)
        .await
        .map_err(map_db_err)?;

    Ok(PageResult {
        items,
        total,
        page,
        page_size,
        pages: total.div_ceil(page_size),
    })
}
