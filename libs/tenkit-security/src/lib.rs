//! Request-scoped identity types for tenant enforcement.
//!
//! An upstream authenticator builds a [`TenantIdentity`] from validated
//! credentials and attaches it to the request scope exactly once. The data
//! access layer reads it on every call and never mutates it.

mod identity;

pub use identity::TenantIdentity;
