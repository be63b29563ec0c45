//! Tenant-scoped data access layer over `SeaORM`.
//!
//! This crate wraps `SeaORM` with a repository facade that enforces
//! row-level tenant and department isolation on every read, write, update
//! and aggregate operation. Scoping is not opt-in: every query on a
//! tenant-participating entity is filtered by the identity carried in the
//! [`RequestScope`], every insert is tagged with it, and operations that
//! cannot be scoped safely fail closed.
//!
//! # Policy
//!
//! | Caller | Tenant filter | Department filter |
//! |--------|---------------|-------------------|
//! | No identity in scope | operation fails (`Unauthenticated`) | — |
//! | Admin | `tenant_id = scope.tenant_id` | never applied |
//! | Member | `tenant_id = scope.tenant_id` | `dept_id = scope.dept_id`, required when the entity has the column |
//!
//! Entities opt out with [`TenantPolicy::TENANT_EXEMPT`]; rows of exempt
//! entities bypass enforcement entirely. Cross-tenant rows are invisible:
//! reads and mutations that would touch them report `NotFound`, never
//! `PermissionDenied`, so the existence of other tenants' data does not
//! leak.
//!
//! # Example
//!
//! ```rust,ignore
//! use tenkit_db::{ConnectOpts, DbHandle, RequestScope};
//! use tenkit_security::TenantIdentity;
//!
//! let db = DbHandle::connect("postgres://app@db/app", ConnectOpts::default()).await?;
//! let repo = db.repository::<order::Entity>();
//!
//! let scope = RequestScope::new()
//!     .with_identity(TenantIdentity::member(tenant_id, dept_id, user_id));
//!
//! // Scoped automatically: only rows of (tenant_id, dept_id) are visible.
//! let order = repo.find_by_id(&scope, order_id).await?;
//!
//! // Writes are tagged automatically; values on the model are overridden.
//! let created = repo.create(&scope, order::ActiveModel { /* ... */ }).await?;
//! ```

pub mod descriptor;
pub mod handle;
pub mod options;
pub mod policy;
pub mod repo;
pub mod scope;
pub mod tenant;
pub mod validate;
pub mod value;

pub use tenkit_errors::{Error, ErrorCode};
pub use tenkit_security::TenantIdentity;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, Error>;

pub use descriptor::{DEPT_COLUMN, EntityDescriptor, FieldDescriptor, TENANT_COLUMN};
pub use handle::{ConnectOpts, DbEngine, DbHandle};
pub use options::QueryOptions;
pub use policy::TenantPolicy;
pub use repo::{DEFAULT_BATCH_SIZE, MAX_PAGE_SIZE, PageResult, Repository};
pub use scope::{RequestScope, TxHandle};
pub use value::ScalarValue;
