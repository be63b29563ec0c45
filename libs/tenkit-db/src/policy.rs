use sea_orm::EntityTrait;

/// Declares whether an entity participates in tenant enforcement.
///
/// Every entity handled by [`Repository`](crate::Repository) must implement
/// this trait. The default keeps enforcement on; genuinely global tables
/// (static lookups, system configuration) opt out explicitly:
///
/// ```rust,ignore
/// impl TenantPolicy for country_code::Entity {
///     const TENANT_EXEMPT: bool = true;
/// }
/// ```
///
/// # Security
///
/// An exempt entity bypasses *all* tenant enforcement: no predicate is
/// injected on reads and no fields are filled on writes. Treat every
/// `TENANT_EXEMPT = true` as security-sensitive and audit each use — the
/// constant exists on a trait precisely so `grep TENANT_EXEMPT` finds them.
pub trait TenantPolicy: EntityTrait {
    /// `true` disables tenant enforcement for this entity.
    const TENANT_EXEMPT: bool = false;
}
