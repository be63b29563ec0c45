use uuid::Uuid;

/// Tenant-scoped claims carried by a request.
///
/// Immutable once attached to a scope. All repository reads and writes on
/// tenant-participating entities are filtered by `tenant_id`, and for
/// non-admin callers additionally by `dept_id`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TenantIdentity {
    /// Tenant the caller belongs to. Required and non-nil.
    pub tenant_id: Uuid,

    /// Department within the tenant. Required for non-admin callers on
    /// entities that carry a `dept_id` column.
    pub dept_id: Option<Uuid>,

    /// Tenant administrators see every department of their tenant. The
    /// tenant filter itself is never lifted.
    pub is_admin: bool,

    /// Acting user, recorded for audit trails.
    pub user_id: Uuid,

    /// Reserved for role-based checks; not consulted by the repository.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Reserved for policy-cache invalidation; not consulted by the
    /// repository.
    #[serde(default)]
    pub policy_version: i64,
}

impl TenantIdentity {
    /// Identity of a tenant administrator (no department restriction).
    #[must_use]
    pub fn admin(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self {
            tenant_id,
            dept_id: None,
            is_admin: true,
            user_id,
            roles: Vec::new(),
            policy_version: 0,
        }
    }

    /// Identity of a regular member bound to one department.
    #[must_use]
    pub fn member(tenant_id: Uuid, dept_id: Uuid, user_id: Uuid) -> Self {
        Self {
            tenant_id,
            dept_id: Some(dept_id),
            is_admin: false,
            user_id,
            roles: Vec::new(),
            policy_version: 0,
        }
    }

    /// Attach a department to this identity.
    #[must_use]
    pub fn with_dept(mut self, dept_id: Uuid) -> Self {
        self.dept_id = Some(dept_id);
        self
    }
}
