//! The generic repository facade.
//!
//! `Repository<E>` is the only surface services use to touch tenant data.
//! For each operation it resolves the execution handle from the scope
//! (transaction if one is open, pooled connection otherwise), applies the
//! tenant scope on the read path or fills tenant fields on the write path,
//! forwards to `SeaORM`, and interprets the result into the closed error
//! taxonomy.
//!
//! Failures are not retried here, and rows-affected = 0 is an expected
//! outcome: it maps to `NotFound` on update/delete paths — including
//! cross-tenant attempts, which are indistinguishable from missing rows by
//! design.

mod aggregate;
mod create;
mod delete;
mod page;
mod query;
mod tx;
mod update;

use std::marker::PhantomData;

use sea_orm::{IdenStatic, Iterable, PrimaryKeyToColumn, QueryFilter, Select, SqlErr};
use tenkit_errors::{Error, ErrorCode};

use crate::Result;
use crate::handle::DbHandle;
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;
use crate::tenant;

/// Default chunk size for batched inserts.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Upper bound on `page_size` for [`Repository::paginate`].
pub const MAX_PAGE_SIZE: u64 = 1000;

/// One page of results plus totals, computed under a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<M> {
    pub items: Vec<M>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub pages: u64,
}

/// Generic repository over one entity type.
///
/// Holds no per-request state: the same instance serves every request, and
/// the [`RequestScope`] passed to each call carries identity, transaction
/// and cancellation.
pub struct Repository<E> {
    db: DbHandle,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<E>())
            .finish_non_exhaustive()
    }
}

impl<E> Repository<E>
where
    E: TenantPolicy,
{
    #[must_use]
    pub fn new(db: DbHandle) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    pub(crate) fn db(&self) -> &DbHandle {
        &self.db
    }

    /// A select with the tenant scope already applied.
    pub(crate) fn scoped_select(&self, scope: &RequestScope) -> Result<Select<E>> {
        let mut query = E::find();
        if let Some(cond) = tenant::scope_condition::<E>(scope)? {
            query = query.filter(cond);
        }
        Ok(query)
    }

    /// The single primary-key column of `E`.
    pub(crate) fn pk_column(&self) -> Result<E::Column> {
        let mut keys = E::PrimaryKey::iter();
        let first = keys
            .next()
            .ok_or_else(|| Error::invalid_argument("entity has no primary key"))?;
        if keys.next().is_some() {
            return Err(Error::invalid_argument(
                "composite primary keys are not supported",
            ));
        }
        Ok(first.into_column())
    }

    /// Columns eligible for the update set of an upsert or map update:
    /// everything except the primary key and the tenant/dept columns.
    pub(crate) fn writable_columns(&self) -> Vec<E::Column> {
        let pk_names: Vec<String> = E::PrimaryKey::iter()
            .map(|pk| pk.into_column().as_str().to_owned())
            .collect();

        E::Column::iter()
            .filter(|col| {
                let name = col.as_str();
                name != crate::descriptor::TENANT_COLUMN
                    && name != crate::descriptor::DEPT_COLUMN
                    && !pk_names.iter().any(|pk| pk == name)
            })
            .collect()
    }
}

/// Map a driver error into the taxonomy: unique-constraint conflicts are
/// `AlreadyExists`, everything else surfaces as `Internal` with the cause
/// attached.
pub(crate) fn map_db_err(err: sea_orm::DbErr) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            Error::wrap(ErrorCode::AlreadyExists, "record already exists", err)
        }
        _ => Error::wrap(ErrorCode::Internal, "database error", err),
    }
}

pub(crate) fn not_found() -> Error {
    Error::not_found("record not found")
}
