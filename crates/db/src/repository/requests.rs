//! Request and request-item repository functions.
//!
//! Reads take the pool; writes take a connection so callers can group them
//! inside one transaction.

use std::collections::HashMap;

use sqlx::mysql::MySqlConnection;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::{
    models::{NewRequestItem, RequestDetails, RequestFields, RequestItemRow, RequestJoinRow, RequestStatus},
    DbError,
};

const SELECT_REQUEST_JOIN: &str = r#"
    SELECT r.id, r.employee_id, r.`type` AS kind, r.status, r.description,
           r.created_at, r.updated_at,
           e.account_id, e.department_id, e.position,
           a.email
    FROM requests r
    INNER JOIN employees e ON e.id = r.employee_id
    INNER JOIN accounts a ON a.id = e.account_id
"#;

// ---------------------------------------------------------------------------
// requests
// ---------------------------------------------------------------------------

/// Insert a request row and return its new id.
pub async fn insert_request(
    conn: &mut MySqlConnection,
    employee_id: i64,
    fields: &RequestFields,
) -> Result<i64, DbError> {
    let result = sqlx::query(
        r#"
        INSERT INTO requests (employee_id, `type`, status, description)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(&fields.kind)
    .bind(fields.status.as_str())
    .bind(&fields.description)
    .execute(conn)
    .await?;

    Ok(result.last_insert_id() as i64)
}

/// Overwrite the mutable columns of a request.
///
/// Returns `false` if no row matched. The MySQL driver connects with
/// `CLIENT_FOUND_ROWS`, so an update that leaves every column unchanged
/// still counts as a match.
pub async fn update_request_fields(
    conn: &mut MySqlConnection,
    id: i64,
    fields: &RequestFields,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET `type` = ?, status = ?, description = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.kind)
    .bind(fields.status.as_str())
    .bind(&fields.description)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Update only the `status` column of a request.
pub async fn update_request_status(
    conn: &mut MySqlConnection,
    id: i64,
    status: RequestStatus,
) -> Result<(), DbError> {
    sqlx::query("UPDATE requests SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete a request. Its items go with it through `ON DELETE CASCADE`.
///
/// Returns `false` if no row was deleted.
pub async fn delete_request(conn: &mut MySqlConnection, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM requests WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Fetch a single request joined with its employee and account email.
pub async fn find_request_row(pool: &MySqlPool, id: i64) -> Result<Option<RequestJoinRow>, DbError> {
    let sql = format!("{SELECT_REQUEST_JOIN} WHERE r.id = ?");
    let row = sqlx::query_as::<_, RequestJoinRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Return all requests, newest first. Ties on `created_at` fall back to id.
pub async fn list_request_rows(pool: &MySqlPool) -> Result<Vec<RequestJoinRow>, DbError> {
    let sql = format!("{SELECT_REQUEST_JOIN} ORDER BY r.created_at DESC, r.id DESC");
    let rows = sqlx::query_as::<_, RequestJoinRow>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// request_items
// ---------------------------------------------------------------------------

/// Insert all `items` for `request_id` in a single multi-row statement.
pub async fn insert_items(
    conn: &mut MySqlConnection,
    request_id: i64,
    items: &[NewRequestItem],
) -> Result<(), DbError> {
    if items.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<MySql> =
        QueryBuilder::new("INSERT INTO request_items (request_id, name, quantity) ");
    qb.push_values(items, |mut row, item| {
        row.push_bind(request_id)
            .push_bind(item.name.clone())
            .push_bind(item.quantity);
    });
    qb.build().execute(conn).await?;
    Ok(())
}

/// Remove every item belonging to `request_id`.
pub async fn delete_items_for_request(conn: &mut MySqlConnection, request_id: i64) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM request_items WHERE request_id = ?")
        .bind(request_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Items of one request in insertion order.
pub async fn list_items_for_request(pool: &MySqlPool, request_id: i64) -> Result<Vec<RequestItemRow>, DbError> {
    let rows = sqlx::query_as::<_, RequestItemRow>(
        r#"
        SELECT id, request_id, name, quantity, created_at, updated_at
        FROM request_items
        WHERE request_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Most ids bound into one `IN (...)` list. A MySQL prepared statement takes
/// at most 65,535 placeholders.
pub const MAX_IDS_PER_QUERY: usize = 1_000;

/// Split `ids` into slices that each fit one `IN (...)` query.
fn id_batches(ids: &[i64]) -> std::slice::Chunks<'_, i64> {
    ids.chunks(MAX_IDS_PER_QUERY)
}

/// Items of several requests, grouped by request id, each group in
/// insertion order.
pub async fn list_items_for_requests(
    pool: &MySqlPool,
    request_ids: &[i64],
) -> Result<HashMap<i64, Vec<RequestItemRow>>, DbError> {
    let mut grouped: HashMap<i64, Vec<RequestItemRow>> = HashMap::new();

    // A request id lands in exactly one batch, so each group stays ordered.
    for batch in id_batches(request_ids) {
        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT id, request_id, name, quantity, created_at, updated_at \
             FROM request_items WHERE request_id IN (",
        );
        let mut ids = qb.separated(", ");
        for id in batch {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY id ASC");

        let rows = qb.build_query_as::<RequestItemRow>().fetch_all(pool).await?;
        for row in rows {
            grouped.entry(row.request_id).or_default().push(row);
        }
    }
    Ok(grouped)
}

// ---------------------------------------------------------------------------
// Aggregate reads
// ---------------------------------------------------------------------------

/// Fetch one request aggregate (employee, account email, items).
pub async fn find_request(pool: &MySqlPool, id: i64) -> Result<Option<RequestDetails>, DbError> {
    let Some(row) = find_request_row(pool, id).await? else {
        return Ok(None);
    };
    let items = list_items_for_request(pool, id).await?;
    RequestDetails::from_parts(row, items).map(Some)
}

/// Fetch every request aggregate, newest first.
pub async fn list_requests(pool: &MySqlPool) -> Result<Vec<RequestDetails>, DbError> {
    let rows = list_request_rows(pool).await?;
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut items = list_items_for_requests(pool, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let own = items.remove(&row.id).unwrap_or_default();
            RequestDetails::from_parts(row, own)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ids_means_no_batches() {
        assert_eq!(id_batches(&[]).count(), 0);
    }

    #[test]
    fn batches_stay_under_the_placeholder_limit_and_cover_every_id() {
        let ids: Vec<i64> = (1..=65_536).collect();

        let batches: Vec<&[i64]> = id_batches(&ids).collect();

        assert_eq!(batches.len(), 66);
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= MAX_IDS_PER_QUERY));
        assert_eq!(batches.concat(), ids);
    }
}
