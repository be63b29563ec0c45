//! Read paths: point lookups, fragment queries, count/exists.
//!
//! Every query carries the tenant scope. Caller-supplied WHERE fragments
//! are ANDed with the scope predicates and can never widen them; a row of
//! another tenant is simply invisible and reads as `NotFound`.

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, FromQueryResult, PaginatorTrait, QueryFilter, Value};

use super::{Repository, map_db_err, not_found};
use crate::Result;
use crate::options::QueryOptions;
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;

impl<E> Repository<E>
where
    E: TenantPolicy,
    E::Model: FromQueryResult + Send + Sync,
{
    /// Find one row by primary key under scope.
    ///
    /// # Errors
    /// `NotFound` when no visible row matches — including rows that exist
    /// under another tenant.
    pub async fn find_by_id<V>(&self, scope: &RequestScope, id: V) -> Result<E::Model>
    where
        V: Into<Value> + Send,
    {
        let pk_col = self.pk_column()?;
        let query = self.scoped_select(scope)?.filter(pk_col.eq(id));

        let exec = scope.resolve(self.db().sea());
        let row = scope
            .guard(async { query.one(&exec).await.map_err(map_db_err) })
            .await?;
        row.ok_or_else(not_found)
    }

    /// Find the rows whose primary keys are in `ids`, intersected with
    /// scope. An empty input returns an empty result without touching the
    /// database.
    ///
    /// # Errors
    /// Driver failures surface as `Internal`.
    pub async fn find_by_ids<V>(&self, scope: &RequestScope, ids: Vec<V>) -> Result<Vec<E::Model>>
    where
        V: Into<Value> + Send,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let pk_col = self.pk_column()?;
        let query = self.scoped_select(scope)?.filter(pk_col.is_in(ids));

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async { query.all(&exec).await.map_err(map_db_err) })
            .await
    }

    /// Find a single row matching the fragment (with `?` placeholders)
    /// under scope.
    ///
    /// # Errors
    /// `NotFound` when nothing visible matches.
    pub async fn find_one(
        &self,
        scope: &RequestScope,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<E::Model> {
        self.find_one_with(scope, fragment, args, &QueryOptions::default())
            .await
    }

    /// [`find_one`](Self::find_one) with query options.
    ///
    /// # Errors
    /// `InvalidArgument` when an option fragment fails validation.
    pub async fn find_one_with(
        &self,
        scope: &RequestScope,
        fragment: &str,
        args: Vec<Value>,
        opts: &QueryOptions,
    ) -> Result<E::Model> {
        let mut query = self.scoped_select(scope)?;
        if !fragment.trim().is_empty() {
            query = query.filter(Expr::cust_with_values(fragment, args));
        }
        let query = opts.apply(query)?;

        let exec = scope.resolve(self.db().sea());
        let row = scope
            .guard(async { query.one(&exec).await.map_err(map_db_err) })
            .await?;
        row.ok_or_else(not_found)
    }

    /// Find every row matching the fragment under scope.
    ///
    /// # Errors
    /// Driver failures surface as `Internal`.
    pub async fn find_by_query(
        &self,
        scope: &RequestScope,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<Vec<E::Model>> {
        self.find_by_query_with(scope, fragment, args, &QueryOptions::default())
            .await
    }

    /// [`find_by_query`](Self::find_by_query) with query options.
    ///
    /// # Errors
    /// `InvalidArgument` when an option fragment fails validation.
    pub async fn find_by_query_with(
        &self,
        scope: &RequestScope,
        fragment: &str,
        args: Vec<Value>,
        opts: &QueryOptions,
    ) -> Result<Vec<E::Model>> {
        let mut query = self.scoped_select(scope)?;
        if !fragment.trim().is_empty() {
            query = query.filter(Expr::cust_with_values(fragment, args));
        }
        let query = opts.apply(query)?;

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async { query.all(&exec).await.map_err(map_db_err) })
            .await
    }

    /// Count the visible rows matching the fragment.
    ///
    /// # Errors
    /// Driver failures surface as `Internal`.
    pub async fn count(&self, scope: &RequestScope, fragment: &str, args: Vec<Value>) -> Result<u64> {
        let mut query = self.scoped_select(scope)?;
        if !fragment.trim().is_empty() {
            query = query.filter(Expr::cust_with_values(fragment, args));
        }

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async { query.count(&exec).await.map_err(map_db_err) })
            .await
    }

    /// Whether any visible row matches the fragment.
    ///
    /// # Errors
    /// Driver failures surface as `Internal`.
    pub async fn exists(
        &self,
        scope: &RequestScope,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<bool> {
        Ok(self.count(scope, fragment, args).await? > 0)
    }
}
