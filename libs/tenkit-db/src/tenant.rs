//! The tenant-scope decision engine.
//!
//! Two pure responsibilities, mirrored across the read and write paths:
//!
//! - [`scope_condition`] decides the predicates a query must carry;
//! - [`fill_tenant_fields`] decides the field assignments a write must
//!   carry.
//!
//! Both fail closed: a tenant-participating entity without an identity in
//! scope is an `Unauthenticated` error, and an entity that cannot be scoped
//! (no `tenant_id` column) is an `InvalidArgument` error. The caller never
//! reaches the database in either case.

use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait};
use tenkit_errors::Error;
use tenkit_security::TenantIdentity;

use crate::Result;
use crate::descriptor::{DEPT_COLUMN, TENANT_COLUMN, column_of, descriptor_for};
use crate::policy::TenantPolicy;
use crate::scope::RequestScope;

/// Predicates a read/mutation on `E` must carry under `scope`.
///
/// Returns `None` for tenant-exempt entities (no predicate injected).
///
/// Decision order:
/// 1. exempt entity → unchanged;
/// 2. no identity → `Unauthenticated`;
/// 3. no `tenant_id` column → `InvalidArgument`;
/// 4. always `tenant_id = scope.tenant_id`;
/// 5. non-admin on a dept-bearing entity → `dept_id = scope.dept_id`,
///    `Unauthenticated` when the scope carries none;
/// 6. admins are never dept-filtered, even when the column exists.
///
/// # Errors
/// See above; all failures happen before any SQL is built.
pub fn scope_condition<E>(scope: &RequestScope) -> Result<Option<Condition>>
where
    E: EntityTrait + TenantPolicy,
{
    let desc = descriptor_for::<E>()?;
    if desc.tenant_exempt {
        return Ok(None);
    }

    let identity = require_identity::<E>(scope)?;

    if !desc.has_tenant_field() {
        return Err(Error::invalid_argument(format!(
            "entity {} has no {TENANT_COLUMN} column",
            desc.table
        )));
    }
    let tenant_col = tenant_column::<E>(TENANT_COLUMN)?;

    let mut cond = Condition::all().add(tenant_col.eq(identity.tenant_id));

    if desc.has_dept_field() && !identity.is_admin {
        let dept = require_dept(identity)?;
        let dept_col = tenant_column::<E>(DEPT_COLUMN)?;
        cond = cond.add(dept_col.eq(dept));
    }

    Ok(Some(cond))
}

/// Assign tenant fields on `entity` before it is persisted.
///
/// Parallels [`scope_condition`] for the write path: the tenant field is
/// always overwritten from the scope (any value present on the in-memory
/// entity is discarded), and the dept field is set whenever the scope
/// carries one. The assignment goes through `ActiveModelTrait::set`, which
/// accepts both nullable and non-nullable declarations of the dept column.
///
/// # Errors
/// Same failure set as [`scope_condition`].
pub fn fill_tenant_fields<E>(scope: &RequestScope, entity: &mut E::ActiveModel) -> Result<()>
where
    E: EntityTrait + TenantPolicy,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
{
    let desc = descriptor_for::<E>()?;
    if desc.tenant_exempt {
        return Ok(());
    }

    let identity = require_identity::<E>(scope)?;

    if !desc.has_tenant_field() {
        return Err(Error::invalid_argument(format!(
            "entity {} has no {TENANT_COLUMN} column",
            desc.table
        )));
    }
    let tenant_col = tenant_column::<E>(TENANT_COLUMN)?;
    entity.set(tenant_col, identity.tenant_id.into());

    if desc.has_dept_field() {
        if !identity.is_admin && identity.dept_id.is_none() {
            return Err(dept_required());
        }
        if let Some(dept) = identity.dept_id {
            let dept_col = tenant_column::<E>(DEPT_COLUMN)?;
            entity.set(dept_col, dept.into());
        }
    }

    Ok(())
}

fn require_identity<E>(scope: &RequestScope) -> Result<&TenantIdentity>
where
    E: EntityTrait,
{
    scope.identity().ok_or_else(|| {
        tracing::warn!(
            entity = %E::default().table_name(),
            "repository call without tenant identity in scope"
        );
        Error::unauthenticated("no tenant identity in scope")
    })
}

fn require_dept(identity: &TenantIdentity) -> Result<uuid::Uuid> {
    identity.dept_id.ok_or_else(dept_required)
}

fn dept_required() -> Error {
    Error::unauthenticated("non-admin user must provide dept_id")
}

// The descriptor vouched for the column; a miss here means the entity
// metadata and the column iterator disagree.
fn tenant_column<E>(name: &str) -> Result<E::Column>
where
    E: EntityTrait,
{
    column_of::<E>(name)
        .ok_or_else(|| Error::internal(format!("column {name} vanished from entity metadata")))
}
