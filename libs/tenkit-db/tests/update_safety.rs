#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Update-path safety: zero-value preservation, tenant immutability,
//! whitelist filtering.

mod common;

use std::collections::HashMap;

use common::{admin_scope, member_scope, setup, widget, widget_model};
use sea_orm::Value;
use tenkit_db::ErrorCode;
use uuid::Uuid;

#[tokio::test]
async fn zero_valued_fields_are_preserved() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());

    let created = repo.create(&scope, widget_model("before", 7)).await.expect("create");

    // Blank out the name in memory; the update must not touch it.
    let mut stale = created.clone();
    stale.name = String::new();
    stale.amount = 9;
    repo.update(&scope, &stale).await.expect("update");

    let row = repo.find_by_id(&scope, created.id).await.expect("reload");
    assert_eq!(row.name, "before");
    assert_eq!(row.amount, 9);
}

#[tokio::test]
async fn update_ignores_tenant_and_dept_values_on_the_model() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();

    let tenant = Uuid::new_v4();
    let dept = Uuid::new_v4();
    let scope = member_scope(tenant, dept);

    let created = repo.create(&scope, widget_model("x", 1)).await.expect("create");

    // Poison the isolation columns in memory.
    let mut poisoned = created.clone();
    poisoned.tenant_id = Uuid::new_v4();
    poisoned.dept_id = Some(Uuid::new_v4());
    poisoned.name = "renamed".to_owned();
    repo.update(&scope, &poisoned).await.expect("update");

    let row = repo.find_by_id(&scope, created.id).await.expect("still visible");
    assert_eq!(row.tenant_id, tenant);
    assert_eq!(row.dept_id, Some(dept));
    assert_eq!(row.name, "renamed");
}

#[tokio::test]
async fn cross_tenant_update_reads_as_not_found() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();

    let scope_a = admin_scope(Uuid::new_v4());
    let scope_b = admin_scope(Uuid::new_v4());

    let created = repo.create(&scope_a, widget_model("a", 1)).await.expect("create");

    let mut foreign = created.clone();
    foreign.name = "hijack".to_owned();
    let err = repo.update(&scope_b, &foreign).await.expect_err("hidden row");
    assert_eq!(err.code(), ErrorCode::NotFound);

    // The row is untouched.
    let row = repo.find_by_id(&scope_a, created.id).await.expect("reload");
    assert_eq!(row.name, "a");
}

#[tokio::test]
async fn update_requires_a_primary_key_and_a_non_empty_set() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());

    let created = repo.create(&scope, widget_model("x", 1)).await.expect("create");

    let mut keyless = created.clone();
    keyless.id = Uuid::nil();
    let err = repo.update(&scope, &keyless).await.expect_err("no key");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    // Every updatable field at its zero value: nothing to apply.
    let mut blank = created.clone();
    blank.name = String::new();
    blank.amount = 0;
    let err = repo.update(&scope, &blank).await.expect_err("nothing to update");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn update_by_id_drops_tenant_keys_regardless_of_whitelist() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();

    let tenant = Uuid::new_v4();
    let scope = admin_scope(tenant);
    let created = repo.create(&scope, widget_model("x", 1)).await.expect("create");

    let mut updates: HashMap<String, Value> = HashMap::new();
    updates.insert("tenant_id".to_owned(), Uuid::new_v4().into());
    updates.insert("dept_id".to_owned(), Uuid::new_v4().into());
    updates.insert("name".to_owned(), "renamed".into());

    repo.update_by_id(&scope, created.id, updates, &["tenant_id", "dept_id", "name"])
        .await
        .expect("update");

    let row = repo.find_by_id(&scope, created.id).await.expect("reload");
    assert_eq!(row.tenant_id, tenant);
    assert_eq!(row.name, "renamed");
}

#[tokio::test]
async fn update_by_id_filters_unknown_and_non_whitelisted_keys() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());
    let created = repo.create(&scope, widget_model("x", 1)).await.expect("create");

    // `amount` is outside the whitelist, `ghost` is unknown, `id` is the
    // primary key: all dropped silently, `name` goes through.
    let mut updates: HashMap<String, Value> = HashMap::new();
    updates.insert("name".to_owned(), "renamed".into());
    updates.insert("amount".to_owned(), 99i64.into());
    updates.insert("ghost".to_owned(), "boo".into());
    updates.insert("id".to_owned(), Uuid::new_v4().into());

    repo.update_by_id(&scope, created.id, updates, &["name"]).await.expect("update");

    let row = repo.find_by_id(&scope, created.id).await.expect("reload");
    assert_eq!(row.name, "renamed");
    assert_eq!(row.amount, 1);
    assert_eq!(row.id, created.id);
}

#[tokio::test]
async fn update_by_id_with_nothing_left_is_an_argument_error() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());
    let created = repo.create(&scope, widget_model("x", 1)).await.expect("create");

    // Everything filters out.
    let mut updates: HashMap<String, Value> = HashMap::new();
    updates.insert("tenant_id".to_owned(), Uuid::new_v4().into());
    updates.insert("ghost".to_owned(), "boo".into());
    let err = repo
        .update_by_id(&scope, created.id, updates, &[])
        .await
        .expect_err("empty after filtering");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    // Empty input map as well.
    let err = repo
        .update_by_id(&scope, created.id, HashMap::new(), &[])
        .await
        .expect_err("empty input");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn update_by_id_on_a_missing_row_is_not_found() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());

    let mut updates: HashMap<String, Value> = HashMap::new();
    updates.insert("name".to_owned(), "renamed".into());
    let err = repo
        .update_by_id(&scope, Uuid::new_v4(), updates, &[])
        .await
        .expect_err("missing row");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn update_batch_applies_all_or_nothing() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());

    let first = repo.create(&scope, widget_model("one", 1)).await.expect("one");
    let second = repo.create(&scope, widget_model("two", 2)).await.expect("two");

    let mut m1 = first.clone();
    m1.name = "one-renamed".to_owned();
    let mut m2 = second.clone();
    m2.name = "two-renamed".to_owned();
    repo.update_batch(&scope, vec![m1, m2]).await.expect("batch");

    assert_eq!(
        repo.find_by_id(&scope, first.id).await.expect("one").name,
        "one-renamed"
    );
    assert_eq!(
        repo.find_by_id(&scope, second.id).await.expect("two").name,
        "two-renamed"
    );

    // One phantom row aborts and rolls back the whole batch.
    let mut m1 = first.clone();
    m1.name = "one-again".to_owned();
    let mut phantom = second.clone();
    phantom.id = Uuid::new_v4();
    phantom.name = "ghost".to_owned();
    let err = repo
        .update_batch(&scope, vec![m1, phantom])
        .await
        .expect_err("phantom row");
    assert_eq!(err.code(), ErrorCode::NotFound);

    assert_eq!(
        repo.find_by_id(&scope, first.id).await.expect("one").name,
        "one-renamed"
    );
}

#[tokio::test]
async fn delete_is_scoped_and_reports_not_found() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();

    let scope_a = admin_scope(Uuid::new_v4());
    let scope_b = admin_scope(Uuid::new_v4());

    let created = repo.create(&scope_a, widget_model("x", 1)).await.expect("create");

    let err = repo.delete(&scope_b, created.id).await.expect_err("hidden");
    assert_eq!(err.code(), ErrorCode::NotFound);
    repo.find_by_id(&scope_a, created.id).await.expect("still there");

    repo.delete(&scope_a, created.id).await.expect("delete");
    let err = repo.find_by_id(&scope_a, created.id).await.expect_err("gone");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn delete_batch_tolerates_zero_matches() {
    let db = setup().await;
    let repo = db.repository::<widget::Entity>();
    let scope = admin_scope(Uuid::new_v4());

    let a = repo.create(&scope, widget_model("a", 1)).await.expect("a");
    let b = repo.create(&scope, widget_model("b", 2)).await.expect("b");

    let removed = repo
        .delete_batch(&scope, vec![a.id, b.id, Uuid::new_v4()])
        .await
        .expect("batch");
    assert_eq!(removed, 2);

    // Nothing left to match: still not an error.
    let removed = repo.delete_batch(&scope, vec![a.id]).await.expect("batch");
    assert_eq!(removed, 0);

    // Empty input is.
    let err = repo.delete_batch::<Uuid>(&scope, vec![]).await.expect_err("empty");
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
}
