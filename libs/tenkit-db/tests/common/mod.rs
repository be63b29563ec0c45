#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

//! Shared fixtures: in-memory database, test entities, identities.

use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tenkit_db::{ConnectOpts, DbHandle, RequestScope, TenantPolicy};
use tenkit_security::TenantIdentity;
use uuid::Uuid;

/// Tenant-scoped entity with a nullable department column.
pub mod widget {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "widgets")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub dept_id: Option<Uuid>,
        pub name: String,
        pub amount: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TenantPolicy for widget::Entity {}

/// Tenant-scoped entity without a department column.
pub mod badge {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "badges")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TenantPolicy for badge::Entity {}

/// Tenant-scoped entity declaring `dept_id` as non-nullable.
pub mod ticket {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "tickets")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub tenant_id: Uuid,
        pub dept_id: Uuid,
        pub title: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TenantPolicy for ticket::Entity {}

/// Global lookup table, exempt from tenant enforcement.
pub mod lookup {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "lookups")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub code: String,
        pub label: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TenantPolicy for lookup::Entity {
    const TENANT_EXEMPT: bool = true;
}

/// Entity without a `tenant_id` column that did NOT opt out: the
/// repository must refuse to touch it.
pub mod orphan {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "orphans")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub note: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl TenantPolicy for orphan::Entity {}

/// Connect to a fresh in-memory database with every test table created.
///
/// A single pooled connection keeps the `:memory:` database alive and
/// shared across operations.
pub async fn setup() -> DbHandle {
    let opts = ConnectOpts {
        max_conns: Some(1),
        min_conns: Some(1),
        ..Default::default()
    };
    let db = DbHandle::connect("sqlite::memory:", opts)
        .await
        .expect("connect");

    create_table(&db, widget::Entity).await;
    create_table(&db, badge::Entity).await;
    create_table(&db, ticket::Entity).await;
    create_table(&db, lookup::Entity).await;

    db
}

async fn create_table<E: EntityTrait>(db: &DbHandle, entity: E) {
    let conn = db.connection();
    let backend = conn.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(entity);
    conn.execute(backend.build(&stmt)).await.expect("create table");
}

pub fn admin_scope(tenant: Uuid) -> RequestScope {
    RequestScope::new().with_identity(TenantIdentity::admin(tenant, Uuid::new_v4()))
}

pub fn member_scope(tenant: Uuid, dept: Uuid) -> RequestScope {
    RequestScope::new().with_identity(TenantIdentity::member(tenant, dept, Uuid::new_v4()))
}

/// Non-admin identity without a department: every operation on a
/// dept-bearing entity must refuse it.
pub fn deptless_member_scope(tenant: Uuid) -> RequestScope {
    let identity = TenantIdentity {
        tenant_id: tenant,
        dept_id: None,
        is_admin: false,
        user_id: Uuid::new_v4(),
        roles: Vec::new(),
        policy_version: 0,
    };
    RequestScope::new().with_identity(identity)
}

pub fn widget_model(name: &str, amount: i64) -> widget::ActiveModel {
    use sea_orm::Set;
    widget::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(Uuid::nil()),
        dept_id: Set(None),
        name: Set(name.to_owned()),
        amount: Set(amount),
    }
}

pub fn badge_model(name: &str) -> badge::ActiveModel {
    use sea_orm::Set;
    badge::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(Uuid::nil()),
        name: Set(name.to_owned()),
    }
}

pub fn ticket_model(title: &str) -> ticket::ActiveModel {
    use sea_orm::Set;
    ticket::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(Uuid::nil()),
        dept_id: Set(Uuid::nil()),
        title: Set(title.to_owned()),
    }
}
