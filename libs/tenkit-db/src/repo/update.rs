//! Update paths: non-destructive model updates and map-based column
//! updates.
//!
//! Both paths share three hard rules: the predicate is always scope AND
//! primary key, the tenant/dept columns are never part of the update set,
//! and zero rows affected reads as `NotFound` — a cross-tenant row is
//! indistinguishable from a missing one.

use std::collections::HashMap;

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, FromQueryResult, IdenStatic, Iterable, ModelTrait, QueryFilter, Value,
};
use tenkit_errors::Error;

use super::{Repository, map_db_err, not_found};
use crate::Result;
use crate::descriptor::{DEPT_COLUMN, TENANT_COLUMN, column_of, descriptor_for};
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;
use crate::tenant;
use crate::value::is_zero_value;

impl<E> Repository<E>
where
    E: TenantPolicy,
    E::Model: ModelTrait<Entity = E> + FromQueryResult + Send + Sync,
{
    /// Update a row from its model, preserving zero-valued fields.
    ///
    /// Only non-zero, updatable fields are written; a field holding its
    /// type's zero value (empty string, 0, false, nil uuid, null) keeps
    /// whatever the database already has. Tenant and dept columns are
    /// excluded unconditionally.
    ///
    /// # Errors
    /// `InvalidArgument` when the primary key is unset or nothing remains
    /// to update; `NotFound` when no visible row matched.
    pub async fn update(&self, scope: &RequestScope, entity: &E::Model) -> Result<()> {
        let descriptor = descriptor_for::<E>()?;
        let pk_col = self.pk_column()?;

        let pk_value: Value = entity.get(pk_col);
        if is_zero_value(&pk_value) {
            return Err(Error::invalid_argument("primary key must be set"));
        }

        let cond = tenant::scope_condition::<E>(scope)?;
        let mut update = E::update_many().filter(pk_col.eq(pk_value));
        if let Some(cond) = cond {
            update = update.filter(cond);
        }

        let mut assigned = 0usize;
        for col in E::Column::iter() {
            let name = col.as_str();
            let Some(field) = descriptor.field(name) else {
                continue;
            };
            if field.primary_key || name == TENANT_COLUMN || name == DEPT_COLUMN {
                continue;
            }

            let value = entity.get(col);
            if is_zero_value(&value) {
                continue;
            }
            update = update.col_expr(col, Expr::value(value));
            assigned += 1;
        }

        if assigned == 0 {
            return Err(Error::invalid_argument("no non-zero fields to update"));
        }

        let exec = scope.resolve(self.db().sea());
        let result = scope
            .guard(async { update.exec(&exec).await.map_err(map_db_err) })
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    /// Update selected columns of one row by primary key.
    ///
    /// `updates` maps storage column names to new values. Keys are
    /// filtered before anything reaches the database:
    /// - `tenant_id` and `dept_id` are dropped regardless of any whitelist;
    /// - with a non-empty `allowed_fields`, keys outside it are dropped;
    /// - keys that are unknown, non-updatable or primary-key columns are
    ///   dropped.
    ///
    /// # Errors
    /// `InvalidArgument` when the filtered set ends up empty; `NotFound`
    /// when no visible row matched.
    pub async fn update_by_id<V>(
        &self,
        scope: &RequestScope,
        id: V,
        updates: HashMap<String, Value>,
        allowed_fields: &[&str],
    ) -> Result<()>
    where
        V: Into<Value> + Send,
    {
        let descriptor = descriptor_for::<E>()?;

        let mut assignments: Vec<(E::Column, Value)> = Vec::with_capacity(updates.len());
        for (key, value) in updates {
            if key == TENANT_COLUMN || key == DEPT_COLUMN {
                continue;
            }
            if !allowed_fields.is_empty() && !allowed_fields.contains(&key.as_str()) {
                continue;
            }
            let Some(field) = descriptor.field(&key) else {
                continue;
            };
            if field.primary_key || !field.updatable {
                continue;
            }
            let Some(col) = column_of::<E>(&key) else {
                continue;
            };
            assignments.push((col, value));
        }

        if assignments.is_empty() {
            return Err(Error::invalid_argument("updates cannot be empty"));
        }

        let pk_col = self.pk_column()?;
        let cond = tenant::scope_condition::<E>(scope)?;
        let mut update = E::update_many().filter(pk_col.eq(id));
        if let Some(cond) = cond {
            update = update.filter(cond);
        }
        for (col, value) in assignments {
            update = update.col_expr(col, Expr::value(value));
        }

        let exec = scope.resolve(self.db().sea());
        let result = scope
            .guard(async { update.exec(&exec).await.map_err(map_db_err) })
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    /// Update many models inside one transaction, each with
    /// [`update`](Self::update) semantics. Checks for cancellation every
    /// hundred rows.
    ///
    /// # Errors
    /// `InvalidArgument` on an empty input; the first failing row aborts
    /// and rolls back the whole batch.
    pub async fn update_batch(&self, scope: &RequestScope, entities: Vec<E::Model>) -> Result<()> {
        if entities.is_empty() {
            return Err(Error::invalid_argument("entities cannot be empty"));
        }

        self.execute(scope, move |tx_scope| {
            let repo = self.clone();
            Box::pin(async move {
                for (index, entity) in entities.iter().enumerate() {
                    if index > 0 && index % 100 == 0 && tx_scope.is_cancelled() {
                        return Err(Error::canceled("request scope cancelled"));
                    }
                    repo.update(tx_scope, entity).await.map_err(|e| {
                        Error::wrap(e.code(), format!("failed to update model at index {index}"), e)
                    })?;
                }
                Ok(())
            })
        })
        .await
    }
}
