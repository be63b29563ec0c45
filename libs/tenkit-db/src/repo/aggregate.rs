//! Aggregates: sum/avg/max/min, grouped counts.
//!
//! Column names arrive as strings and are validated against the bare
//! identifier whitelist before they are interpolated — a qualified or
//! otherwise unusual name is `InvalidArgument`, never SQL. Predicates are
//! ANDed with the tenant scope like every other read.

use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, FromQueryResult, QueryFilter, QuerySelect, QueryTrait, Select,
    TryGetable, Value,
};
use tenkit_errors::Error;

use super::{Repository, map_db_err};
use crate::Result;
use crate::descriptor::column_of;
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;
use crate::validate;
use crate::value::{ScalarValue, decode_scalar};

const AGG_ALIAS: &str = "agg";

impl<E> Repository<E>
where
    E: TenantPolicy,
    E::Model: FromQueryResult + Send + Sync,
{
    /// `COALESCE(SUM(column), 0)` over the visible rows.
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe column name.
    pub async fn sum(
        &self,
        scope: &RequestScope,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<f64> {
        self.coalesced_aggregate(scope, "SUM", column, fragment, args)
            .await
    }

    /// `COALESCE(AVG(column), 0)` over the visible rows.
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe column name.
    pub async fn avg(
        &self,
        scope: &RequestScope,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<f64> {
        self.coalesced_aggregate(scope, "AVG", column, fragment, args)
            .await
    }

    /// `MAX(column)` over the visible rows, dynamically typed.
    ///
    /// The declared column type picks the decoded variant; no rows (or an
    /// all-NULL column) yields [`ScalarValue::Null`].
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe or unknown column name.
    pub async fn max(
        &self,
        scope: &RequestScope,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<ScalarValue> {
        self.extremum(scope, "MAX", column, fragment, args).await
    }

    /// `MIN(column)` over the visible rows, dynamically typed. See
    /// [`max`](Self::max).
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe or unknown column name.
    pub async fn min(
        &self,
        scope: &RequestScope,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<ScalarValue> {
        self.extremum(scope, "MIN", column, fragment, args).await
    }

    /// `MAX(column)` scanned into a caller-chosen type.
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe column name; decode mismatches
    /// surface as `Internal`.
    pub async fn max_as<T>(
        &self,
        scope: &RequestScope,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<Option<T>>
    where
        T: TryGetable + Send,
    {
        self.extremum_as(scope, "MAX", column, fragment, args).await
    }

    /// `MIN(column)` scanned into a caller-chosen type.
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe column name; decode mismatches
    /// surface as `Internal`.
    pub async fn min_as<T>(
        &self,
        scope: &RequestScope,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<Option<T>>
    where
        T: TryGetable + Send,
    {
        self.extremum_as(scope, "MIN", column, fragment, args).await
    }

    /// `GROUP BY column` with `COUNT(*)` per group, keyed by the group
    /// value rendered as text.
    ///
    /// # Errors
    /// `InvalidArgument` for an unsafe column name.
    pub async fn count_by_group(
        &self,
        scope: &RequestScope,
        group_column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<HashMap<String, i64>> {
        validate::validate_column(group_column)?;

        let query = self
            .fragment_scoped(scope, fragment, args)?
            .select_only()
            .expr_as(Expr::cust(group_column), "group_key")
            .expr_as(Expr::cust("COUNT(*)"), "cnt")
            .group_by(Expr::cust(group_column));

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async {
                let stmt = query.build(exec.get_database_backend());
                let rows = exec.query_all(stmt).await.map_err(map_db_err)?;

                let mut groups = HashMap::with_capacity(rows.len());
                for row in rows {
                    let key: Option<String> = row
                        .try_get("", "group_key")
                        .map_err(|e| Error::wrap(tenkit_errors::ErrorCode::Internal, "failed to decode group key", e))?;
                    let count: i64 = row
                        .try_get("", "cnt")
                        .map_err(|e| Error::wrap(tenkit_errors::ErrorCode::Internal, "failed to decode group count", e))?;
                    groups.insert(key.unwrap_or_default(), count);
                }
                Ok(groups)
            })
            .await
    }

    fn fragment_scoped(
        &self,
        scope: &RequestScope,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<Select<E>> {
        let mut query = self.scoped_select(scope)?;
        if !fragment.trim().is_empty() {
            query = query.filter(Expr::cust_with_values(fragment, args));
        }
        Ok(query)
    }

    async fn coalesced_aggregate(
        &self,
        scope: &RequestScope,
        func: &str,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<f64> {
        validate::validate_column(column)?;

        let query = self
            .fragment_scoped(scope, fragment, args)?
            .select_only()
            .expr_as(
                Expr::cust(format!("COALESCE({func}({column}), 0)")),
                AGG_ALIAS,
            );

        let exec = scope.resolve(self.db().sea());
        let value: Option<f64> = scope
            .guard(async {
                query
                    .into_tuple()
                    .one(&exec)
                    .await
                    .map_err(map_db_err)
            })
            .await?;
        Ok(value.unwrap_or(0.0))
    }

    async fn extremum(
        &self,
        scope: &RequestScope,
        func: &str,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<ScalarValue> {
        validate::validate_column(column)?;
        let col = column_of::<E>(column)
            .ok_or_else(|| Error::invalid_argument(format!("unknown column: {column}")))?;
        let column_type = col.def().get_column_type().clone();

        let query = self
            .fragment_scoped(scope, fragment, args)?
            .select_only()
            .expr_as(Expr::cust(format!("{func}({column})")), AGG_ALIAS);

        let exec = scope.resolve(self.db().sea());
        scope
            .guard(async {
                let stmt = query.build(exec.get_database_backend());
                let row = exec.query_one(stmt).await.map_err(map_db_err)?;
                match row {
                    None => Ok(ScalarValue::Null),
                    Some(row) => decode_scalar(&row, AGG_ALIAS, &column_type),
                }
            })
            .await
    }

    async fn extremum_as<T>(
        &self,
        scope: &RequestScope,
        func: &str,
        column: &str,
        fragment: &str,
        args: Vec<Value>,
    ) -> Result<Option<T>>
    where
        T: TryGetable + Send,
    {
        validate::validate_column(column)?;

        let query = self
            .fragment_scoped(scope, fragment, args)?
            .select_only()
            .expr_as(Expr::cust(format!("{func}({column})")), AGG_ALIAS);

        let exec = scope.resolve(self.db().sea());
        let value: Option<Option<T>> = scope
            .guard(async {
                query
                    .into_tuple()
                    .one(&exec)
                    .await
                    .map_err(map_db_err)
            })
            .await?;
        Ok(value.flatten())
    }
}
