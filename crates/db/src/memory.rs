//! `MemoryStore`: an in-process [`RequestStore`] test double.
//!
//! Useful in unit tests where a MySQL server is unavailable or irrelevant.
//! It mirrors the database rules the request service relies on: the
//! employee foreign key is checked on insert, ids are assigned
//! monotonically, and deleting a request removes the children that the
//! association graph marks as cascading.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    AccountEmail, EmployeeSummary, NewRequest, NewRequestItem, RequestDetails, RequestFields,
    RequestItemRow, RequestStatus,
};
use crate::schema::{self, Entity};
use crate::store::RequestStore;
use crate::DbError;

#[derive(Debug, Clone)]
struct StoredRequest {
    employee_id: i64,
    fields: RequestFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    employees: BTreeMap<i64, EmployeeSummary>,
    requests: BTreeMap<i64, StoredRequest>,
    items: Vec<RequestItemRow>,
    next_request_id: i64,
    next_item_id: i64,
    /// Last timestamp handed out; keeps `created_at` strictly increasing.
    clock: Option<DateTime<Utc>>,
}

impl State {
    fn tick(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.clock {
            if now <= last {
                now = last + chrono::Duration::microseconds(1);
            }
        }
        self.clock = Some(now);
        now
    }

    fn push_items(&mut self, request_id: i64, items: &[NewRequestItem]) {
        for item in items {
            let now = self.tick();
            self.next_item_id += 1;
            self.items.push(RequestItemRow {
                id: self.next_item_id,
                request_id,
                name: item.name.clone(),
                quantity: item.quantity,
                created_at: now,
                updated_at: now,
            });
        }
    }

    fn items_of(&self, request_id: i64) -> Vec<RequestItemRow> {
        self.items
            .iter()
            .filter(|i| i.request_id == request_id)
            .cloned()
            .collect()
    }

    fn details(&self, id: i64) -> Option<RequestDetails> {
        let stored = self.requests.get(&id)?;
        let employee = self.employees.get(&stored.employee_id)?.clone();
        Some(RequestDetails {
            id,
            employee_id: stored.employee_id,
            kind: stored.fields.kind.clone(),
            status: stored.fields.status,
            description: stored.fields.description.clone(),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
            employee,
            items: self.items_of(id),
        })
    }

    /// Remove rows of `child` whose foreign key points at `parent_id`.
    fn delete_children(&mut self, child: Entity, parent_id: i64) {
        // The memory store holds no other child tables.
        if child == Entity::RequestItem {
            self.items.retain(|i| i.request_id != parent_id);
        }
    }

    fn touch(&mut self, id: i64) -> Option<&mut StoredRequest> {
        let now = self.tick();
        let stored = self.requests.get_mut(&id)?;
        stored.updated_at = now;
        Some(stored)
    }
}

/// A [`RequestStore`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an employee (and its account email) that requests may reference.
    pub fn with_employee(self, employee_id: i64, email: impl Into<String>) -> Self {
        self.state().employees.insert(
            employee_id,
            EmployeeSummary {
                id: employee_id,
                account_id: employee_id,
                department_id: None,
                position: "Staff".to_string(),
                account: AccountEmail { email: email.into() },
            },
        );
        self
    }

    /// Total number of item rows across all requests.
    pub fn item_count(&self) -> usize {
        self.state().items.len()
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn list_requests(&self) -> Result<Vec<RequestDetails>, DbError> {
        let state = self.state();
        let mut all: Vec<RequestDetails> = state
            .requests
            .keys()
            .filter_map(|id| state.details(*id))
            .collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    async fn find_request(&self, id: i64) -> Result<Option<RequestDetails>, DbError> {
        Ok(self.state().details(id))
    }

    async fn find_items(&self, request_id: i64) -> Result<Vec<RequestItemRow>, DbError> {
        Ok(self.state().items_of(request_id))
    }

    async fn insert_request(&self, request: &NewRequest) -> Result<i64, DbError> {
        let mut state = self.state();
        if !state.employees.contains_key(&request.employee_id) {
            let fk = schema::between(Entity::Employee, Entity::Request)
                .map(|a| a.foreign_key)
                .unwrap_or("employee_id");
            return Err(DbError::Constraint(format!(
                "{}.{fk} references missing employee {}",
                Entity::Request.table_name(),
                request.employee_id
            )));
        }

        let now = state.tick();
        state.next_request_id += 1;
        let id = state.next_request_id;
        state.requests.insert(
            id,
            StoredRequest {
                employee_id: request.employee_id,
                fields: request.fields.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        state.push_items(id, &request.items);
        Ok(id)
    }

    async fn update_request(
        &self,
        id: i64,
        fields: &RequestFields,
        items: Option<&[NewRequestItem]>,
    ) -> Result<bool, DbError> {
        let mut state = self.state();
        let Some(stored) = state.touch(id) else {
            return Ok(false);
        };
        stored.fields = fields.clone();

        if let Some(items) = items {
            state.delete_children(Entity::RequestItem, id);
            state.push_items(id, items);
        }
        Ok(true)
    }

    async fn update_status(&self, id: i64, status: RequestStatus) -> Result<(), DbError> {
        let mut state = self.state();
        if let Some(stored) = state.touch(id) {
            stored.fields.status = status;
        }
        Ok(())
    }

    async fn append_items(&self, request_id: i64, items: &[NewRequestItem]) -> Result<(), DbError> {
        let mut state = self.state();
        if !state.requests.contains_key(&request_id) {
            return Err(DbError::Constraint(format!(
                "{}.request_id references missing request {request_id}",
                Entity::RequestItem.table_name()
            )));
        }
        state.push_items(request_id, items);
        Ok(())
    }

    async fn delete_request(&self, id: i64) -> Result<bool, DbError> {
        let mut state = self.state();
        if state.requests.remove(&id).is_none() {
            return Ok(false);
        }
        for assoc in schema::cascades_from(Entity::Request) {
            state.delete_children(assoc.child, id);
        }
        Ok(true)
    }
}
