//! Per-entity persistent layout, discovered once and memoized.
//!
//! The repository never hardcodes knowledge about an entity beyond two
//! well-known column names: tenant-participating entities declare storage
//! columns literally named `tenant_id` and (optionally) `dept_id`. The
//! descriptor records those slots together with the primary-key set and the
//! updatable flags, so scoping and field filling are driven by metadata
//! rather than by per-entity code.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use sea_orm::{ColumnTrait, EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn};
use tenkit_errors::Error;

use crate::Result;
use crate::policy::TenantPolicy;

/// Storage column holding the tenant identifier.
pub const TENANT_COLUMN: &str = "tenant_id";
/// Storage column holding the department identifier.
pub const DEPT_COLUMN: &str = "dept_id";

/// One persistent field of an entity.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Storage column name.
    pub name: String,
    /// Declared (Rust-side) field name, e.g. `TenantId` for `tenant_id`.
    pub declared: String,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// Whether update paths may write this column. `SeaORM` exposes no
    /// generated/readonly markers, so this is the primary-key complement;
    /// tenant and dept immutability is enforced separately.
    pub updatable: bool,
}

/// Cached persistent-layout metadata for one entity type.
///
/// Created lazily on the first repository call for the entity, cached
/// process-wide for the life of the process, never mutated.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Storage table name.
    pub table: String,
    /// Ordered persistent fields.
    pub fields: Vec<FieldDescriptor>,
    /// Index into `fields` of the `tenant_id` column, when present.
    pub tenant_field: Option<usize>,
    /// Index into `fields` of the `dept_id` column, when present.
    pub dept_field: Option<usize>,
    /// Whether the `dept_id` column is declared nullable.
    pub dept_nullable: bool,
    /// Whether the entity opted out of tenant enforcement.
    pub tenant_exempt: bool,

    by_column: HashMap<String, usize>,
    by_declared: HashMap<String, usize>,
}

impl EntityDescriptor {
    /// Look up a field by storage column name.
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&FieldDescriptor> {
        self.by_column.get(column).map(|&i| &self.fields[i])
    }

    /// Look up a field by its declared (Rust-side) name.
    #[must_use]
    pub fn field_by_declared(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_declared.get(name).map(|&i| &self.fields[i])
    }

    #[must_use]
    pub fn has_tenant_field(&self) -> bool {
        self.tenant_field.is_some()
    }

    #[must_use]
    pub fn has_dept_field(&self) -> bool {
        self.dept_field.is_some()
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<TypeId, Arc<EntityDescriptor>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Resolve (and memoize) the descriptor for `E`.
///
/// Safe for concurrent first use: readers share the lock, the first writer
/// parses under the exclusive lock with a double-check so the layout is
/// never parsed twice.
///
/// # Errors
///
/// Layout parse failures surface as `InvalidArgument` with the cause
/// attached.
pub fn descriptor_for<E>() -> Result<Arc<EntityDescriptor>>
where
    E: EntityTrait + TenantPolicy,
{
    let key = TypeId::of::<E>();
    if let Some(desc) = REGISTRY.read().get(&key) {
        return Ok(desc.clone());
    }

    let mut registry = REGISTRY.write();
    if let Some(desc) = registry.get(&key) {
        return Ok(desc.clone());
    }

    let desc = Arc::new(parse::<E>()?);
    tracing::debug!(table = %desc.table, exempt = desc.tenant_exempt, "parsed entity layout");
    registry.insert(key, desc.clone());
    Ok(desc)
}

/// Resolve a `SeaORM` column by storage name.
#[must_use]
pub fn column_of<E>(name: &str) -> Option<E::Column>
where
    E: EntityTrait,
{
    E::Column::iter().find(|col| col.as_str() == name)
}

fn parse<E>() -> Result<EntityDescriptor>
where
    E: EntityTrait + TenantPolicy,
{
    let table = E::default().table_name().to_owned();

    let pk_columns: Vec<String> = E::PrimaryKey::iter()
        .map(|pk| pk.into_column().as_str().to_owned())
        .collect();

    let mut fields = Vec::new();
    let mut by_column = HashMap::new();
    let mut by_declared = HashMap::new();
    let mut tenant_field = None;
    let mut dept_field = None;
    let mut dept_nullable = false;

    for col in E::Column::iter() {
        let name = col.as_str().to_owned();
        let declared = format!("{col:?}");
        let primary_key = pk_columns.iter().any(|pk| *pk == name);

        let index = fields.len();
        match name.as_str() {
            TENANT_COLUMN => tenant_field = Some(index),
            DEPT_COLUMN => {
                dept_field = Some(index);
                dept_nullable = col.def().is_null();
            }
            _ => {}
        }

        by_column.insert(name.clone(), index);
        by_declared.insert(declared.clone(), index);
        fields.push(FieldDescriptor {
            name,
            declared,
            primary_key,
            updatable: !primary_key,
        });
    }

    if fields.is_empty() {
        return Err(Error::invalid_argument(format!(
            "entity {table} declares no persistent fields"
        )));
    }

    Ok(EntityDescriptor {
        table,
        fields,
        tenant_field,
        dept_field,
        dept_nullable,
        tenant_exempt: E::TENANT_EXEMPT,
        by_column,
        by_declared,
    })
}
