//! The `RequestStore` trait, the persistence contract the request service is
//! written against, and its MySQL implementation.

use async_trait::async_trait;

use crate::models::{NewRequest, NewRequestItem, RequestDetails, RequestFields, RequestItemRow, RequestStatus};
use crate::pool::{Database, DbPool};
use crate::repository::requests as repo;
use crate::DbError;

/// Aggregate-level storage for requests and their items.
///
/// Each method is a single logical write or read. Implementations that can
/// group statements (SQL transactions) must make each write all-or-nothing.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Every request aggregate, newest `created_at` first.
    async fn list_requests(&self) -> Result<Vec<RequestDetails>, DbError>;

    async fn find_request(&self, id: i64) -> Result<Option<RequestDetails>, DbError>;

    /// Items of one request in insertion order.
    async fn find_items(&self, request_id: i64) -> Result<Vec<RequestItemRow>, DbError>;

    /// Insert the request and all of its items; returns the new id.
    async fn insert_request(&self, request: &NewRequest) -> Result<i64, DbError>;

    /// Overwrite the scalar fields. When `items` is `Some`, the request's
    /// existing items are replaced by exactly that set (possibly empty).
    /// Returns `false`, writing nothing, if the request does not exist.
    async fn update_request(
        &self,
        id: i64,
        fields: &RequestFields,
        items: Option<&[NewRequestItem]>,
    ) -> Result<bool, DbError>;

    async fn update_status(&self, id: i64, status: RequestStatus) -> Result<(), DbError>;

    /// Add items without touching the ones already present.
    async fn append_items(&self, request_id: i64, items: &[NewRequestItem]) -> Result<(), DbError>;

    /// Delete the request and its items. Returns `false` if it did not exist.
    async fn delete_request(&self, id: i64) -> Result<bool, DbError>;
}

// ---------------------------------------------------------------------------
// MySQL
// ---------------------------------------------------------------------------

/// [`RequestStore`] backed by the bootstrapped MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: DbPool,
}

impl MySqlStore {
    /// Only a bootstrapped [`Database`] can back a store.
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}

#[async_trait]
impl RequestStore for MySqlStore {
    async fn list_requests(&self) -> Result<Vec<RequestDetails>, DbError> {
        repo::list_requests(&self.pool).await
    }

    async fn find_request(&self, id: i64) -> Result<Option<RequestDetails>, DbError> {
        repo::find_request(&self.pool, id).await
    }

    async fn find_items(&self, request_id: i64) -> Result<Vec<RequestItemRow>, DbError> {
        repo::list_items_for_request(&self.pool, request_id).await
    }

    async fn insert_request(&self, request: &NewRequest) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;
        let id = repo::insert_request(&mut *tx, request.employee_id, &request.fields).await?;
        repo::insert_items(&mut *tx, id, &request.items).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn update_request(
        &self,
        id: i64,
        fields: &RequestFields,
        items: Option<&[NewRequestItem]>,
    ) -> Result<bool, DbError> {
        let mut tx = self.pool.begin().await?;
        if !repo::update_request_fields(&mut *tx, id, fields).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        if let Some(items) = items {
            repo::delete_items_for_request(&mut *tx, id).await?;
            repo::insert_items(&mut *tx, id, items).await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn update_status(&self, id: i64, status: RequestStatus) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        repo::update_request_status(&mut *conn, id, status).await
    }

    async fn append_items(&self, request_id: i64, items: &[NewRequestItem]) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        repo::insert_items(&mut *conn, request_id, items).await
    }

    async fn delete_request(&self, id: i64) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        repo::delete_request(&mut *conn, id).await
    }
}
