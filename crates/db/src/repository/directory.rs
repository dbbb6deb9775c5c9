//! Accounts, departments, employees and the rows hanging off them.
//!
//! Request rows need an employee (and the employee an account) to exist
//! first; these functions create and read that side of the schema.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::mysql::MySqlConnection;
use sqlx::types::Json;
use sqlx::MySqlPool;

use crate::{
    models::{AccountRow, DepartmentRow, EmployeeRow, RefreshTokenRow, WorkflowRow},
    DbError,
};

// ---------------------------------------------------------------------------
// accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

pub async fn insert_account(conn: &mut MySqlConnection, account: &NewAccount) -> Result<i64, DbError> {
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (email, password_hash, title, first_name, last_name, role)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.title)
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.role)
    .execute(conn)
    .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn get_account(pool: &MySqlPool, id: i64) -> Result<AccountRow, DbError> {
    sqlx::query_as::<_, AccountRow>(
        r#"
        SELECT id, email, password_hash, title, first_name, last_name, role,
               verified_at, created_at, updated_at
        FROM accounts WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Delete an account; its refresh tokens are removed by the cascade.
///
/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_account(pool: &MySqlPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// refresh_tokens
// ---------------------------------------------------------------------------

pub async fn insert_refresh_token(
    pool: &MySqlPool,
    account_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
    created_by_ip: Option<&str>,
) -> Result<i64, DbError> {
    let result = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (account_id, token, expires_at, created_by_ip)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(account_id)
    .bind(token)
    .bind(expires_at)
    .bind(created_by_ip)
    .execute(pool)
    .await?;
    Ok(result.last_insert_id() as i64)
}

pub async fn list_refresh_tokens(pool: &MySqlPool, account_id: i64) -> Result<Vec<RefreshTokenRow>, DbError> {
    let rows = sqlx::query_as::<_, RefreshTokenRow>(
        r#"
        SELECT id, account_id, token, expires_at, created_by_ip, revoked_at,
               revoked_by_ip, replaced_by_token, created_at
        FROM refresh_tokens
        WHERE account_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// departments
// ---------------------------------------------------------------------------

pub async fn insert_department(pool: &MySqlPool, name: &str, description: &str) -> Result<DepartmentRow, DbError> {
    let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    get_department(pool, result.last_insert_id() as i64).await
}

pub async fn get_department(pool: &MySqlPool, id: i64) -> Result<DepartmentRow, DbError> {
    sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name, description, created_at, updated_at FROM departments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

pub async fn list_departments(pool: &MySqlPool) -> Result<Vec<DepartmentRow>, DbError> {
    let rows = sqlx::query_as::<_, DepartmentRow>(
        "SELECT id, name, description, created_at, updated_at FROM departments ORDER BY name ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Delete a department; its employees keep existing with no department.
pub async fn delete_department(pool: &MySqlPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// employees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub department_id: Option<i64>,
    pub position: String,
    pub hire_date: NaiveDate,
}

/// Create an account and its employee in one transaction.
pub async fn hire_employee(
    pool: &MySqlPool,
    account: &NewAccount,
    employee: &NewEmployee,
) -> Result<EmployeeRow, DbError> {
    let mut tx = pool.begin().await?;

    let account_id = insert_account(&mut *tx, account).await?;
    let result = sqlx::query(
        r#"
        INSERT INTO employees (account_id, department_id, position, hire_date)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(account_id)
    .bind(employee.department_id)
    .bind(&employee.position)
    .bind(employee.hire_date)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    get_employee(pool, result.last_insert_id() as i64).await
}

pub async fn get_employee(pool: &MySqlPool, id: i64) -> Result<EmployeeRow, DbError> {
    sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT id, account_id, department_id, position, hire_date, status,
               created_at, updated_at
        FROM employees WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

pub async fn list_employees(pool: &MySqlPool) -> Result<Vec<EmployeeRow>, DbError> {
    let rows = sqlx::query_as::<_, EmployeeRow>(
        r#"
        SELECT id, account_id, department_id, position, hire_date, status,
               created_at, updated_at
        FROM employees ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// workflows
// ---------------------------------------------------------------------------

pub async fn insert_workflow(
    pool: &MySqlPool,
    employee_id: i64,
    kind: &str,
    details: serde_json::Value,
) -> Result<WorkflowRow, DbError> {
    let result = sqlx::query("INSERT INTO workflows (employee_id, `type`, details) VALUES (?, ?, ?)")
        .bind(employee_id)
        .bind(kind)
        .bind(Json(details))
        .execute(pool)
        .await?;

    let row = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, employee_id, `type`, details, status, created_at, updated_at
        FROM workflows WHERE id = ?
        "#,
    )
    .bind(result.last_insert_id() as i64)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn list_workflows(pool: &MySqlPool, employee_id: i64) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, employee_id, `type`, details, status, created_at, updated_at
        FROM workflows WHERE employee_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
