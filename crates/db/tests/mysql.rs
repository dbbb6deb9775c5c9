//! Tests against a live MySQL server.
//!
//! Run with `cargo test -p db --features integration`. Connection settings
//! come from the `DB_*` environment variables, falling back to a local
//! server and an `hr_portal_test` schema.

#![cfg(feature = "integration")]

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

use db::models::{NewRequest, NewRequestItem, RequestFields, RequestStatus};
use db::repository::directory::{self, NewAccount, NewEmployee};
use db::schema::Entity;
use db::{bootstrap, Database, DatabaseConfig, DbError, MySqlStore, RequestStore};

const DEFAULTS: &str = r#"{
    "database": {
        "host": "127.0.0.1",
        "port": 3306,
        "user": "root",
        "password": "",
        "database": "hr_portal_test",
        "ssl_mode": "preferred",
        "max_connections": 4
    }
}"#;

async fn database() -> Database {
    let mut config = DatabaseConfig::from_json_str(DEFAULTS).unwrap();
    config.apply_env(|key| std::env::var(key).ok()).unwrap();
    bootstrap(&config).await.expect("bootstrap against test server")
}

/// Unique suffix so tests can share one schema without colliding.
fn unique(tag: &str) -> String {
    format!("{tag}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn hire(db: &Database) -> i64 {
    let account = NewAccount {
        email: format!("{}@example.com", unique("it")),
        password_hash: "x".into(),
        title: None,
        first_name: "Test".into(),
        last_name: "Employee".into(),
        role: "user".into(),
    };
    let employee = NewEmployee {
        department_id: None,
        position: "Engineer".into(),
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
    };
    directory::hire_employee(db.pool(), &account, &employee)
        .await
        .unwrap()
        .id
}

fn request(employee_id: i64, items: &[(&str, i32)]) -> NewRequest {
    NewRequest {
        employee_id,
        fields: RequestFields {
            kind: "equipment".into(),
            status: RequestStatus::Pending,
            description: Some("integration".into()),
        },
        items: items
            .iter()
            .map(|(name, quantity)| NewRequestItem { name: name.to_string(), quantity: *quantity })
            .collect(),
    }
}

#[tokio::test]
async fn bootstrap_registers_all_seven_entities_and_is_idempotent() {
    let first = database().await;
    let second = database().await;

    for entity in Entity::ALL {
        assert!(first.registry().contains(entity), "{} missing", entity.table_name());
    }
    assert_eq!(first.registry(), second.registry());
}

#[tokio::test]
async fn request_round_trips_with_items_in_insertion_order() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let employee_id = hire(&db).await;

    let id = store
        .insert_request(&request(employee_id, &[("Laptop", 1), ("Mouse", 2)]))
        .await
        .unwrap();
    let details = store.find_request(id).await.unwrap().unwrap();

    assert_eq!(details.status, RequestStatus::Pending);
    assert_eq!(details.employee.id, employee_id);
    assert!(details.employee.account.email.ends_with("@example.com"));
    let items: Vec<(&str, i32)> = details.items.iter().map(|i| (i.name.as_str(), i.quantity)).collect();
    assert_eq!(items, vec![("Laptop", 1), ("Mouse", 2)]);
}

#[tokio::test]
async fn deleting_a_request_cascades_to_its_items() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let employee_id = hire(&db).await;
    let id = store
        .insert_request(&request(employee_id, &[("Chair", 1)]))
        .await
        .unwrap();

    assert!(store.delete_request(id).await.unwrap());

    assert!(store.find_request(id).await.unwrap().is_none());
    assert!(store.find_items(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn replacing_items_with_an_empty_set_removes_them() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let employee_id = hire(&db).await;
    let req = request(employee_id, &[("Laptop", 1)]);
    let id = store.insert_request(&req).await.unwrap();

    assert!(store.update_request(id, &req.fields, Some(&[])).await.unwrap());
    assert!(store.find_items(id).await.unwrap().is_empty());

    store.append_items(id, &[NewRequestItem { name: "Dock".into(), quantity: 1 }]).await.unwrap();
    assert!(store.update_request(id, &req.fields, None).await.unwrap());
    assert_eq!(store.find_items(id).await.unwrap().len(), 1);
}

/// Longer than `request_items.name`; strict mode rejects it instead of
/// truncating.
fn oversized_item() -> NewRequestItem {
    NewRequestItem { name: "x".repeat(300), quantity: 1 }
}

#[tokio::test]
async fn failed_item_insert_rolls_back_the_new_request() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let employee_id = hire(&db).await;
    let mut req = request(employee_id, &[("Laptop", 1)]);
    req.items.push(oversized_item());

    store.insert_request(&req).await.unwrap_err();

    let all = store.list_requests().await.unwrap();
    assert!(all.iter().all(|r| r.employee_id != employee_id));
}

#[tokio::test]
async fn failed_item_replacement_keeps_old_fields_and_items() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let employee_id = hire(&db).await;
    let req = request(employee_id, &[("Laptop", 1), ("Mouse", 2)]);
    let id = store.insert_request(&req).await.unwrap();
    let before = store.find_request(id).await.unwrap().unwrap();

    let changed = RequestFields {
        kind: "hardware".into(),
        status: RequestStatus::Approved,
        description: None,
    };
    store
        .update_request(id, &changed, Some(&[oversized_item()]))
        .await
        .unwrap_err();

    let after = store.find_request(id).await.unwrap().unwrap();
    assert_eq!(after.kind, "equipment");
    assert_eq!(after.status, RequestStatus::Pending);
    assert_eq!(after.description.as_deref(), Some("integration"));
    assert_eq!(after.items, before.items);
}

#[tokio::test]
async fn updating_a_missing_request_reports_false() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let req = request(0, &[]);

    assert!(!store.update_request(i64::MAX, &req.fields, Some(&[])).await.unwrap());
}

#[tokio::test]
async fn unknown_employee_is_rejected_by_the_foreign_key() {
    let db = database().await;
    let store = MySqlStore::new(&db);

    let err = store.insert_request(&request(i64::MAX, &[("Laptop", 1)])).await.unwrap_err();

    assert!(err.is_constraint_violation(), "unexpected error: {err}");
}

#[tokio::test]
async fn list_is_newest_first() {
    let db = database().await;
    let store = MySqlStore::new(&db);
    let employee_id = hire(&db).await;
    store.insert_request(&request(employee_id, &[])).await.unwrap();
    store.insert_request(&request(employee_id, &[])).await.unwrap();

    let all = store.list_requests().await.unwrap();

    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn deleting_an_account_cascades_to_refresh_tokens() {
    let db = database().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let account_id = directory::insert_account(
        &mut *conn,
        &NewAccount {
            email: format!("{}@example.com", unique("tok")),
            password_hash: "x".into(),
            title: Some("Dr".into()),
            first_name: "Token".into(),
            last_name: "Holder".into(),
            role: "admin".into(),
        },
    )
    .await
    .unwrap();
    drop(conn);

    directory::insert_refresh_token(db.pool(), account_id, &unique("rt"), Utc::now() + Duration::days(7), Some("10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(directory::list_refresh_tokens(db.pool(), account_id).await.unwrap().len(), 1);

    directory::delete_account(db.pool(), account_id).await.unwrap();

    assert!(directory::list_refresh_tokens(db.pool(), account_id).await.unwrap().is_empty());
    assert!(matches!(directory::get_account(db.pool(), account_id).await, Err(DbError::NotFound)));
}

#[tokio::test]
async fn employees_outlive_their_department_and_own_workflows() {
    let db = database().await;
    let department = directory::insert_department(db.pool(), &unique("Ops"), "Operations").await.unwrap();

    let hired = directory::hire_employee(
        db.pool(),
        &NewAccount {
            email: format!("{}@example.com", unique("dept")),
            password_hash: "x".into(),
            title: None,
            first_name: "Dee".into(),
            last_name: "Partment".into(),
            role: "user".into(),
        },
        &NewEmployee {
            department_id: Some(department.id),
            position: "Analyst".into(),
            hire_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        },
    )
    .await
    .unwrap();

    let workflow = directory::insert_workflow(db.pool(), hired.id, "onboarding", json!({ "steps": ["laptop", "badge"] }))
        .await
        .unwrap();
    assert_eq!(workflow.details.0["steps"][1], "badge");
    assert_eq!(directory::list_workflows(db.pool(), hired.id).await.unwrap().len(), 1);

    directory::delete_department(db.pool(), department.id).await.unwrap();

    let employee = directory::get_employee(db.pool(), hired.id).await.unwrap();
    assert_eq!(employee.department_id, None);
}
